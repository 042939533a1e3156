//! Prompt capability injected into the policy resolver.

use crate::SyncError;

/// One entry of a fixed option set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub description: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
        }
    }
}

/// Asks the user to pick one of `options`.
///
/// Implementations return an index into `options`; `default` is always a
/// valid index.
pub trait Prompter {
    fn choose(&mut self, prompt: &str, options: &[Choice], default: usize)
        -> Result<usize, SyncError>;
}

/// Never blocks: always answers with the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive;

impl Prompter for NonInteractive {
    fn choose(
        &mut self,
        _prompt: &str,
        _options: &[Choice],
        default: usize,
    ) -> Result<usize, SyncError> {
        Ok(default)
    }
}
