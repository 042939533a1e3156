//! Registry contract consumed by the reconcilers.
//!
//! The transport lives outside this crate (the CLI ships an HTTP client);
//! everything here talks to the registry through [`RemoteRegistry`].

use std::fmt;

use thiserror::Error;

use keel_core::records::{TestBlock, TestBuildConfig, TestDefinition, TestMetadata};
use keel_core::{Platform, RemoteId};

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Identity-only projection of a test from the registry listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTestSummary {
    pub id: RemoteId,
    pub name: String,
    pub platform: String,
}

/// Identity-only projection of a workflow from the registry listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteWorkflowSummary {
    pub id: RemoteId,
    pub name: String,
}

/// A build-linked application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteApp {
    pub id: RemoteId,
    pub name: String,
    pub platform: String,
}

/// Full test content as held by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTest {
    pub id: RemoteId,
    pub name: String,
    pub platform: String,
    pub version: u64,
    pub blocks: Vec<TestBlock>,
    pub build_name: Option<String>,
    pub pinned_version: Option<String>,
}

impl RemoteTest {
    /// Local representation of this content, platform lowercased.
    pub fn to_definition(&self) -> TestDefinition {
        let build = if self.build_name.is_some() || self.pinned_version.is_some() {
            Some(TestBuildConfig {
                name: self.build_name.clone().unwrap_or_default(),
                pinned_version: self.pinned_version.clone(),
            })
        } else {
            None
        };
        let platform = self.platform.trim().to_ascii_lowercase();
        TestDefinition {
            metadata: TestMetadata {
                name: self.name.clone(),
                platform: (!platform.is_empty()).then_some(platform),
                description: None,
            },
            build,
            blocks: self.blocks.clone(),
        }
    }
}

/// Result of an accepted push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushReceipt {
    pub version: u64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a linked remote id cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkIssue {
    Missing,
    InvalidId,
    Unauthorized,
    Forbidden,
}

impl LinkIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkIssue::Missing => "missing",
            LinkIssue::InvalidId => "invalid-id",
            LinkIssue::Unauthorized => "unauthorized",
            LinkIssue::Forbidden => "forbidden",
        }
    }

    /// Human explanation shown on the item.
    pub fn message(&self) -> &'static str {
        match self {
            LinkIssue::Missing => "remote test no longer exists",
            LinkIssue::InvalidId => "remote id is not valid",
            LinkIssue::Unauthorized => "registry rejected the credentials for this test",
            LinkIssue::Forbidden => "access to the remote test is denied",
        }
    }
}

impl fmt::Display for LinkIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by a registry implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The registry refused a push because the expected version is outdated.
    #[error("version conflict: {0}")]
    Conflict(String),

    #[error("registry returned HTTP {code}: {message}")]
    Status { code: u16, message: String },

    #[error("registry unreachable: {0}")]
    Transport(String),

    #[error("unexpected registry response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Map an HTTP status and body to the matching variant.
    pub fn from_status(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            400 => RemoteError::InvalidId(message),
            401 => RemoteError::Unauthorized(message),
            403 => RemoteError::Forbidden(message),
            404 => RemoteError::NotFound(message),
            409 => RemoteError::Conflict(message),
            _ => RemoteError::Status { code, message },
        }
    }

    /// The orphan sub-reason this error stands for, if any.
    pub fn link_issue(&self) -> Option<LinkIssue> {
        match self {
            RemoteError::NotFound(_) => Some(LinkIssue::Missing),
            RemoteError::InvalidId(_) => Some(LinkIssue::InvalidId),
            RemoteError::Unauthorized(_) => Some(LinkIssue::Unauthorized),
            RemoteError::Forbidden(_) => Some(LinkIssue::Forbidden),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound(_))
    }
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Everything the reconcilers need from the registry.
///
/// Calls are blocking; implementations own their timeouts.
pub trait RemoteRegistry {
    fn list_tests(&self) -> Result<Vec<RemoteTestSummary>, RemoteError>;

    fn list_workflows(&self) -> Result<Vec<RemoteWorkflowSummary>, RemoteError>;

    fn get_test(&self, id: &RemoteId) -> Result<RemoteTest, RemoteError>;

    /// Replace the content of test `id`. `expected_version` is the version the
    /// local content was based on; a newer registry version yields
    /// [`RemoteError::Conflict`].
    fn push_test(
        &self,
        id: &RemoteId,
        test: &TestDefinition,
        expected_version: u64,
    ) -> Result<PushReceipt, RemoteError>;

    fn get_app(&self, id: &RemoteId) -> Result<RemoteApp, RemoteError>;

    /// Applications for `platform`, or all of them when `None`.
    fn list_apps(&self, platform: Option<Platform>) -> Result<Vec<RemoteApp>, RemoteError>;
}
