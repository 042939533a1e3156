//! Workflows domain: pure alias → id references, no content versioning.

use std::collections::BTreeSet;

use tracing::info;

use keel_core::types::duplicate_aliases;
use keel_core::{alias, Alias, ProjectManifest, RemoteId};

use super::{by_name_then_id, Reconciler};
use crate::policy::{Action, EntityKind, Situation};
use crate::report::{DomainReport, SyncItem};

/// Reconcile `manifest.workflows` against the registry listing.
pub fn reconcile(cx: &mut Reconciler<'_>, manifest: &mut ProjectManifest) -> DomainReport {
    let mut report = DomainReport::default();
    let dry_run = cx.options().dry_run;

    let mut remote = match cx.registry.list_workflows() {
        Ok(remote) => remote,
        Err(err) => {
            report.push(SyncItem::failure("workflows", Action::List, err));
            return report;
        }
    };
    remote.sort_by(|a, b| by_name_then_id((&a.name, a.id.as_str()), (&b.name, b.id.as_str())));
    let listed: BTreeSet<RemoteId> = remote.iter().map(|w| w.id.clone()).collect();

    // Import
    let mut known: BTreeSet<RemoteId> = manifest.workflows.values().cloned().collect();
    let mut planned: BTreeSet<Alias> = BTreeSet::new();
    for workflow in &remote {
        if workflow.id.is_empty() || known.contains(&workflow.id) {
            continue;
        }
        let base = alias::base_alias(&workflow.name, &workflow.id, "workflow");
        let alias = alias::ensure_unique(&base, |a| {
            manifest.workflows.contains_key(a) || planned.contains(a)
        });
        known.insert(workflow.id.clone());

        let mut item = SyncItem::new(alias.as_str(), workflow.id.as_str(), "remote-only")
            .with_message("discovered on the registry and added to the manifest");
        item.set_action(Action::Import, dry_run);
        if dry_run {
            planned.insert(alias);
        } else {
            info!(%alias, id = %workflow.id, "imported workflow");
            manifest.workflows.insert(alias, workflow.id.clone());
            report.changed = true;
        }
        report.push(item);
    }

    // Stale
    let stale: Vec<(Alias, RemoteId)> = manifest
        .workflows
        .iter()
        .filter(|(_, id)| !listed.contains(*id))
        .map(|(alias, id)| (alias.clone(), id.clone()))
        .collect();
    for (alias, id) in stale {
        let decision = cx.resolver.resolve(&Situation::StaleWorkflow {
            alias: alias.as_str(),
        });
        let mut item = SyncItem::new(alias.as_str(), id.as_str(), "stale")
            .with_message("workflow id is absent from the registry listing");
        item.set_decision(decision, dry_run);
        if !dry_run && decision.action == Action::Prune {
            info!(%alias, %id, "pruned stale workflow alias");
            manifest.workflows.remove(&alias);
            report.changed = true;
        }
        report.push(item);
    }

    // Duplicates
    for (id, aliases) in duplicate_aliases(&manifest.workflows) {
        let Some((canonical, rest)) = aliases.split_first() else {
            continue;
        };
        for alias in rest {
            let decision = cx.resolver.resolve(&Situation::Duplicate {
                kind: EntityKind::Workflow,
                alias: alias.as_str(),
                canonical: canonical.as_str(),
            });
            let mut item = SyncItem::new(alias.as_str(), id.as_str(), "duplicate")
                .with_message(format!("duplicates {canonical}"));
            item.set_decision(decision, dry_run);
            if !dry_run && decision.action == Action::Prune {
                info!(%alias, %canonical, "pruned duplicate workflow alias");
                manifest.workflows.remove(alias);
                report.changed = true;
            }
            report.push(item);
        }
    }

    report
}
