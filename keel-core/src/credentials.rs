//! User-level registry credentials in `~/.keel/credentials.yaml`.
//!
//! Follows the same `_at(home)` / no-arg wrapper split as the manifest API:
//! tests always pass an explicit home.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, StoreError};

/// Stored API credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

/// `<home>/.keel/credentials.yaml`: pure, no I/O.
pub fn credentials_path_at(home: &Path) -> PathBuf {
    home.join(".keel").join("credentials.yaml")
}

/// Load credentials from `<home>/.keel/credentials.yaml`; `None` if absent.
pub fn load_credentials_at(home: &Path) -> Result<Option<Credentials>, StoreError> {
    let path = credentials_path_at(home);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(io_err(&path, err)),
    };
    serde_yaml::from_str(&contents)
        .map(Some)
        .map_err(|source| StoreError::Parse { path, source })
}

/// `load_credentials_at` convenience wrapper.
pub fn load_credentials() -> Result<Option<Credentials>, StoreError> {
    load_credentials_at(&home()?)
}

fn home() -> Result<PathBuf, StoreError> {
    dirs::home_dir().ok_or(StoreError::HomeNotFound)
}
