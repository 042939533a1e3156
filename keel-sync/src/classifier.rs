//! Per-alias test status classification.
//!
//! Two independent signals are computed for each alias:
//! - `reachability`: fetch of the linked id, compared against the local record
//! - `listing`: whether the manifest id appears in the bulk registry listing
//!
//! Precedence ([`TestStatus::classification`]):
//! 1. `Stale` (listing says the id is absent)
//! 2. `Failed` (per-item registry error other than an orphan reason)
//! 3. the reachability status, `Orphaned` included
//!
//! Status derivation for a reachable id:
//!
//! | local record | local changed | remote changed | status      |
//! |--------------|---------------|----------------|-------------|
//! | none         | -             | -              | remote-only |
//! | unreadable   | assumed       | -              | conflict    |
//! | parsed       | no            | no             | synced      |
//! | parsed       | yes           | no             | modified    |
//! | parsed       | no            | yes            | outdated    |
//! | parsed       | yes           | yes            | conflict    |

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use keel_core::{manifest, records, Alias, LocalRecord, LocalRecords, ProjectManifest, RemoteId};

use crate::remote::{LinkIssue, RemoteRegistry};
use crate::SyncError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Sync status of one alias, derived per run and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStatus {
    Synced,
    /// The registry holds a newer version.
    Outdated,
    /// Local content changed since the last sync.
    Modified,
    /// Both sides changed since the last sync.
    Conflict,
    /// No remote link.
    LocalOnly,
    /// Linked remotely but no local content yet.
    RemoteOnly,
    /// The linked id cannot be reached.
    Orphaned(LinkIssue),
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Synced => "synced",
            SyncStatus::Outdated => "outdated",
            SyncStatus::Modified => "modified",
            SyncStatus::Conflict => "conflict",
            SyncStatus::LocalOnly => "local-only",
            SyncStatus::RemoteOnly => "remote-only",
            SyncStatus::Orphaned(_) => "orphaned",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the per-item reachability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    Resolved(SyncStatus),
    /// Raw registry error, attached instead of a guessed status.
    Failed(String),
}

/// Presence of the manifest id in the registry listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingStatus {
    Listed,
    Absent,
    /// The alias has no manifest id to look up.
    Unchecked,
}

/// Final classification after applying precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Stale,
    Failed(String),
    Status(SyncStatus),
}

/// Classification inputs and result for one alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestStatus {
    pub alias: Alias,
    /// The id the status was computed against (manifest first, record fallback).
    pub remote_id: Option<RemoteId>,
    pub reachability: Reachability,
    pub listing: ListingStatus,
    pub local_version: Option<u64>,
    pub remote_version: Option<u64>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl TestStatus {
    /// Listing-based staleness wins over the per-item check.
    pub fn classification(&self) -> Classification {
        if self.listing == ListingStatus::Absent {
            return Classification::Stale;
        }
        match &self.reachability {
            Reachability::Failed(err) => Classification::Failed(err.clone()),
            Reachability::Resolved(status) => Classification::Status(*status),
        }
    }

    /// Label for display: `stale`, `error`, or the status name.
    pub fn label(&self) -> &'static str {
        match self.classification() {
            Classification::Stale => "stale",
            Classification::Failed(_) => "error",
            Classification::Status(status) => status.as_str(),
        }
    }

    pub fn id_str(&self) -> &str {
        self.remote_id.as_ref().map(RemoteId::as_str).unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify every alias known to the manifest or the local record store.
///
/// Aliases are returned sorted. A record whose file stem is already claimed
/// by a manifest alias (exactly or via its sanitized form) is not listed twice.
/// Nothing is mutated.
pub fn classify(
    registry: &dyn RemoteRegistry,
    manifest: &ProjectManifest,
    local: &LocalRecords,
    root: &Path,
    listed: &BTreeSet<RemoteId>,
) -> Vec<TestStatus> {
    let mut aliases: BTreeSet<Alias> = manifest.tests.keys().cloned().collect();
    let claimed: BTreeSet<Alias> = manifest
        .tests
        .keys()
        .filter_map(|alias| records::locate(local, root, alias).0)
        .filter_map(|entry| entry.path.file_stem())
        .map(|stem| Alias::from(stem.to_string_lossy().into_owned()))
        .collect();
    aliases.extend(local.keys().filter(|a| !claimed.contains(*a)).cloned());

    aliases
        .into_iter()
        .map(|alias| classify_one(registry, manifest, local, root, listed, alias))
        .collect()
}

fn classify_one(
    registry: &dyn RemoteRegistry,
    manifest: &ProjectManifest,
    local: &LocalRecords,
    root: &Path,
    listed: &BTreeSet<RemoteId>,
    alias: Alias,
) -> TestStatus {
    let (entry, _) = records::locate(local, root, &alias);
    let parsed = entry.and_then(|e| e.parsed());
    let manifest_id = manifest.tests.get(&alias).filter(|id| !id.is_empty()).cloned();
    let record_id = entry.and_then(|e| e.remote_id()).cloned();

    let listing = match &manifest_id {
        Some(id) if listed.contains(id) => ListingStatus::Listed,
        Some(_) => ListingStatus::Absent,
        None => ListingStatus::Unchecked,
    };

    let mut status = TestStatus {
        alias,
        remote_id: manifest_id.clone().or_else(|| record_id.clone()),
        reachability: Reachability::Resolved(SyncStatus::LocalOnly),
        listing,
        local_version: parsed.map(|r| r.meta.local_version),
        remote_version: None,
        last_synced_at: parsed.and_then(|r| r.meta.last_synced_at),
    };
    let Some(primary) = status.remote_id.clone() else {
        return status;
    };

    let fetched = match registry.get_test(&primary) {
        Ok(remote) => Ok(remote),
        Err(err) => match (&record_id, err.link_issue()) {
            (Some(fallback), Some(_)) if *fallback != primary => {
                debug!(alias = %status.alias, %primary, %fallback, "trying record remote id");
                match registry.get_test(fallback) {
                    Ok(remote) => {
                        status.remote_id = Some(fallback.clone());
                        Ok(remote)
                    }
                    Err(_) => Err(err),
                }
            }
            _ => Err(err),
        },
    };

    let remote = match fetched {
        Ok(remote) => remote,
        Err(err) => {
            status.reachability = match err.link_issue() {
                Some(issue) => Reachability::Resolved(SyncStatus::Orphaned(issue)),
                None => Reachability::Failed(err.to_string()),
            };
            return status;
        }
    };
    status.remote_version = Some(remote.version);

    let derived = match entry.map(|e| &e.record) {
        None => SyncStatus::RemoteOnly,
        Some(LocalRecord::Unreadable { reason }) => {
            warn!(alias = %status.alias, %reason, "unreadable local record; treating as conflict");
            SyncStatus::Conflict
        }
        Some(LocalRecord::Parsed(record)) => {
            let local_changed = record.has_local_changes();
            let remote_changed = remote.version > record.meta.remote_version;
            match (local_changed, remote_changed) {
                (false, false) => SyncStatus::Synced,
                (true, false) => SyncStatus::Modified,
                (false, true) => SyncStatus::Outdated,
                (true, true) => SyncStatus::Conflict,
            }
        }
    };
    status.reachability = Reachability::Resolved(derived);
    status
}

/// Read-only status of every test in the project at `root`.
pub fn status_at(
    root: &Path,
    registry: &dyn RemoteRegistry,
) -> Result<Vec<TestStatus>, SyncError> {
    let manifest = manifest::load_manifest_at(root)?;
    let local = records::load_local_records_at(root)?;
    let listed = registry
        .list_tests()?
        .into_iter()
        .map(|summary| summary.id)
        .collect();
    Ok(classify(registry, &manifest, &local, root, &listed))
}

/// Format age from a chrono timestamp (`last_synced_at`).
pub fn format_datetime_age(timestamp: DateTime<Utc>) -> String {
    let age = Utc::now().signed_duration_since(timestamp).num_seconds().max(0) as u64;
    format_seconds(age)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}
