//! Domain reconcilers, run by the orchestrator in this order:
//!
//! 1. [`tests`]: import, classify, pull/push/detach/prune, duplicates
//! 2. [`workflows`]: import, stale, duplicates
//! 3. [`app_links`]: `build.platforms.*.app_id` validation and repair
//! 4. [`hotreload`]: read-only provider mapping checks

use std::cmp::Ordering;
use std::path::Path;

use crate::policy::{PolicyResolver, RunOptions};
use crate::remote::RemoteRegistry;

pub mod app_links;
pub mod hotreload;
pub mod workflows;

/// Shared collaborators for one run.
pub struct Reconciler<'a> {
    pub registry: &'a dyn RemoteRegistry,
    pub resolver: PolicyResolver<'a>,
    /// Project root holding `.keel/`.
    pub root: &'a Path,
}

impl Reconciler<'_> {
    pub fn options(&self) -> RunOptions {
        self.resolver.options()
    }
}

/// Case-insensitive name order, id as tie-break.
pub(crate) fn by_name_then_id(a: (&str, &str), b: (&str, &str)) -> Ordering {
    a.0.to_lowercase()
        .cmp(&b.0.to_lowercase())
        .then_with(|| a.1.cmp(b.1))
}
