//! Sync orchestrator used by `keel sync`.
//!
//! Domains run in a fixed order (tests, workflows, app links, hot reload)
//! against one in-memory manifest. The manifest is written at most once,
//! after every domain has finished, and never under dry-run.

use std::path::Path;

use tracing::{info, warn};

use keel_core::manifest;

use crate::domains::{self, Reconciler};
use crate::policy::{Action, PolicyResolver, RunOptions};
use crate::prompt::Prompter;
use crate::remote::RemoteRegistry;
use crate::report::{SyncItem, SyncReport};
use crate::SyncError;

/// Which domains a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainSelection {
    pub tests: bool,
    pub workflows: bool,
    pub apps: bool,
    pub hotreload: bool,
}

impl DomainSelection {
    pub fn all() -> Self {
        Self {
            tests: true,
            workflows: true,
            apps: true,
            hotreload: true,
        }
    }

    /// No domain flag means every domain.
    pub fn from_flags(tests: bool, workflows: bool, apps: bool, skip_hotreload: bool) -> Self {
        let any = tests || workflows || apps;
        Self {
            tests: tests || !any,
            workflows: workflows || !any,
            apps: apps || !any,
            hotreload: !skip_hotreload,
        }
    }
}

impl Default for DomainSelection {
    fn default() -> Self {
        Self::all()
    }
}

/// Run the selected domains for the project at `root`.
///
/// Only a missing or unreadable manifest is returned as `Err`; every other
/// failure is attached to an item of the returned report.
pub fn run(
    root: &Path,
    registry: &dyn RemoteRegistry,
    prompter: &mut dyn Prompter,
    selection: DomainSelection,
    options: RunOptions,
) -> Result<SyncReport, SyncError> {
    let mut manifest = manifest::load_manifest_at(root)?;
    let mut report = SyncReport {
        mode: options.mode_label().to_string(),
        dry_run: options.dry_run,
        ..SyncReport::default()
    };
    let mut changed = false;

    let mut cx = Reconciler {
        registry,
        resolver: PolicyResolver::new(options, prompter),
        root,
    };

    if selection.tests {
        let domain = domains::tests::reconcile(&mut cx, &mut manifest);
        changed |= domain.changed;
        report.tests = domain.items;
    }
    if selection.workflows {
        let domain = domains::workflows::reconcile(&mut cx, &mut manifest);
        changed |= domain.changed;
        report.workflows = domain.items;
    }
    if selection.apps {
        let domain = domains::app_links::reconcile(&mut cx, &mut manifest);
        changed |= domain.changed;
        report.app_links = domain.items;
    }
    if selection.hotreload {
        report.hotreload_checks = domains::hotreload::validate(&manifest).items;
    }

    if changed && !options.dry_run {
        manifest.mark_synced();
        match manifest::save_manifest_at(root, &manifest) {
            Ok(()) => info!(root = %root.display(), "manifest written"),
            Err(err) => {
                warn!(error = %err, "failed to persist manifest");
                report.tests.push(
                    SyncItem::failure(".keel/config.yaml", Action::Write, err)
                        .with_message("failed to persist project manifest"),
                );
            }
        }
    }

    report.summary = report.compute_summary();
    Ok(report)
}
