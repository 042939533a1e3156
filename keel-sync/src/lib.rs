//! # keel-sync
//!
//! Reconciliation of a keel project against the remote registry.
//!
//! Call [`pipeline::run`] to reconcile every selected domain and persist the
//! manifest once, [`classifier::status_at`] for a read-only status listing,
//! or [`diff::diff_test`] to compare one test with its registry copy.

pub mod classifier;
pub mod diff;
pub mod domains;
pub mod error;
pub mod pipeline;
pub mod policy;
pub mod prompt;
pub mod remote;
pub mod report;

pub use classifier::{SyncStatus, TestStatus};
pub use error::SyncError;
pub use pipeline::{run, DomainSelection};
pub use policy::{Action, Interactivity, RunOptions};
pub use prompt::{Choice, NonInteractive, Prompter};
pub use remote::{RemoteError, RemoteRegistry};
pub use report::{SyncItem, SyncReport};
