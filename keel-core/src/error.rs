//! Error types for keel-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from manifest and local record persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure, annotated with the path that was touched.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The manifest file did not exist at the expected path.
    #[error("manifest not found at {path}; run `keel init` first")]
    ManifestNotFound { path: PathBuf },

    /// No ancestor of `start` contains `.keel/config.yaml`.
    #[error("no keel project found in {start} or any parent directory")]
    ProjectNotFound { start: PathBuf },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.keel/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
