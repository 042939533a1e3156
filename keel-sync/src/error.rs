//! Error types for keel-sync.

use thiserror::Error;

use keel_core::StoreError;

use crate::remote::RemoteError;

/// All errors that can arise from reconciliation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Manifest or local record persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The registry rejected or failed a request.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The prompt capability failed to produce an answer.
    #[error("prompt failed: {0}")]
    Prompt(String),

    /// `--interactive` was requested but stdin cannot prompt.
    #[error("--interactive requires a TTY on stdin")]
    InteractiveUnavailable,

    /// A push needs readable local content for `alias`.
    #[error("no readable local record for test `{alias}`")]
    MissingRecord { alias: String },

    /// Neither the manifest nor the local record links `alias` to the registry.
    #[error("test `{alias}` has no remote id")]
    NotLinked { alias: String },

    /// Relink found no applications of the expected platform.
    #[error("no {platform} apps available for relink")]
    NoRelinkCandidates { platform: String },

    /// `alias` is neither in the manifest nor under `.keel/tests/`.
    #[error("unknown test alias `{alias}`")]
    UnknownAlias { alias: String },
}
