//! Unified diff between a local test definition and its registry copy, for
//! `keel diff`.
//!
//! Nothing is written.

use std::path::Path;

use similar::TextDiff;

use keel_core::records::TestDefinition;
use keel_core::{manifest, records, Alias, RemoteId};

use crate::remote::RemoteRegistry;
use crate::SyncError;

/// Diff result for one alias. `unified_diff` is empty when both sides match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDiff {
    pub alias: Alias,
    pub remote_id: RemoteId,
    pub local_version: u64,
    pub remote_version: u64,
    pub unified_diff: String,
}

impl TestDiff {
    pub fn is_empty(&self) -> bool {
        self.unified_diff.is_empty()
    }
}

/// Compare the local content of `alias` with the registry's current content.
pub fn diff_test(
    root: &Path,
    registry: &dyn RemoteRegistry,
    alias: &Alias,
) -> Result<TestDiff, SyncError> {
    let manifest = manifest::load_manifest_at(root)?;
    let local = records::load_local_records_at(root)?;
    let (entry, _) = records::locate(&local, root, alias);

    let Some(entry) = entry else {
        return Err(if manifest.tests.contains_key(alias) {
            SyncError::MissingRecord {
                alias: alias.to_string(),
            }
        } else {
            SyncError::UnknownAlias {
                alias: alias.to_string(),
            }
        });
    };
    let record = entry.parsed().ok_or_else(|| SyncError::MissingRecord {
        alias: alias.to_string(),
    })?;

    let remote_id = record
        .remote_id()
        .or_else(|| manifest.tests.get(alias).filter(|id| !id.is_empty()))
        .cloned()
        .ok_or_else(|| SyncError::NotLinked {
            alias: alias.to_string(),
        })?;
    let remote = registry.get_test(&remote_id)?;

    let old = render(&record.test)?;
    let new = render(&remote.to_definition())?;
    let unified_diff = if old == new {
        String::new()
    } else {
        TextDiff::from_lines(&old, &new)
            .unified_diff()
            .header(&format!("a/local/{alias}.yaml"), &format!("b/remote/{remote_id}"))
            .context_radius(3)
            .to_string()
    };

    Ok(TestDiff {
        alias: alias.clone(),
        remote_id,
        local_version: record.meta.local_version,
        remote_version: remote.version,
        unified_diff,
    })
}

fn render(test: &TestDefinition) -> Result<String, SyncError> {
    let yaml = serde_yaml::to_string(test).map_err(keel_core::StoreError::from)?;
    Ok(yaml.replace("\r\n", "\n"))
}
