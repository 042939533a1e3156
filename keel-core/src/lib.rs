//! keel core library: manifest and local record types, persistence, errors.
//!
//! - [`types`]: newtypes and the project manifest model
//! - [`manifest`]: load / save / init of `.keel/config.yaml`
//! - [`records`]: cached test definitions under `.keel/tests/`
//! - [`alias`]: alias synthesis for imported entities
//! - [`credentials`]: `~/.keel/credentials.yaml`
//! - [`error`]: [`StoreError`]

pub mod alias;
pub mod credentials;
pub mod error;
pub mod manifest;
pub mod records;
pub mod types;

pub use error::StoreError;
pub use records::{LocalEntry, LocalRecord, LocalRecords, LocalTestRecord};
pub use types::{
    Alias, BuildPlatform, HotReloadConfig, Platform, ProjectManifest, ProviderConfig, RemoteId,
};
