//! Local test records: cached test definitions under `.keel/tests/`.
//!
//! # Storage layout
//!
//! ```text
//! <project>/.keel/
//!   config.yaml
//!   tests/
//!     <alias>.yaml      (one record per alias: `_meta` sync state + `test` content)
//! ```
//!
//! A record that cannot be read or parsed is still surfaced (as
//! [`LocalRecord::Unreadable`]) so that callers never mistake uncertain state
//! for "unchanged".

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{io_err, StoreError};
use crate::manifest::keel_dir_path_at;
use crate::types::{Alias, RemoteId};

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// Sync metadata of a local test record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TestMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<RemoteId>,
    /// Registry version at the last pull/push.
    #[serde(default)]
    pub remote_version: u64,
    /// Incremented on local edits.
    #[serde(default)]
    pub local_version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
    /// SHA-256 of the serialized `test` section at the last save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// Test metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TestMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// App build a test runs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TestBuildConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_version: Option<String>,
}

/// One step of a test. Control-flow blocks nest further blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TestBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub then: Vec<TestBlock>,
    #[serde(rename = "else", default, skip_serializing_if = "Vec::is_empty")]
    pub otherwise: Vec<TestBlock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<TestBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
}

/// The test content proper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TestDefinition {
    pub metadata: TestMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<TestBuildConfig>,
    #[serde(default)]
    pub blocks: Vec<TestBlock>,
}

/// A full `.keel/tests/<alias>.yaml` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LocalTestRecord {
    #[serde(rename = "_meta", default)]
    pub meta: TestMeta,
    pub test: TestDefinition,
}

impl LocalTestRecord {
    /// True when the content diverges from the last-synced baseline.
    ///
    /// A local version ahead of the remote version counts as a change; so does
    /// a checksum mismatch. Records without a checksum (written before
    /// checksums existed) are compared by version only.
    pub fn has_local_changes(&self) -> bool {
        if self.meta.local_version > self.meta.remote_version {
            return true;
        }
        match &self.meta.checksum {
            Some(stored) => *stored != checksum(&self.test),
            None => false,
        }
    }

    /// Remote id recorded in `_meta`, if non-blank.
    pub fn remote_id(&self) -> Option<&RemoteId> {
        self.meta.remote_id.as_ref().filter(|id| !id.is_empty())
    }

    /// Drop every trace of the remote link. Returns `true` if anything changed.
    pub fn clear_remote_link(&mut self) -> bool {
        let changed = self.meta.remote_id.is_some()
            || self.meta.remote_version != 0
            || self.meta.last_synced_at.is_some();
        self.meta.remote_id = None;
        self.meta.remote_version = 0;
        self.meta.last_synced_at = None;
        changed
    }
}

/// SHA-256 hex digest of the YAML rendering of a test definition.
pub fn checksum(test: &TestDefinition) -> String {
    let yaml = serde_yaml::to_string(test).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(yaml.as_bytes());
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Loaded entries
// ---------------------------------------------------------------------------

/// Parse state of one record file.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalRecord {
    Parsed(LocalTestRecord),
    /// The file exists but could not be read or parsed.
    Unreadable { reason: String },
}

/// A record file on disk together with its parse state.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalEntry {
    pub path: PathBuf,
    pub record: LocalRecord,
}

impl LocalEntry {
    /// Unreadable records always report local changes.
    pub fn has_local_changes(&self) -> bool {
        match &self.record {
            LocalRecord::Parsed(record) => record.has_local_changes(),
            LocalRecord::Unreadable { .. } => true,
        }
    }

    pub fn parsed(&self) -> Option<&LocalTestRecord> {
        match &self.record {
            LocalRecord::Parsed(record) => Some(record),
            LocalRecord::Unreadable { .. } => None,
        }
    }

    pub fn parsed_mut(&mut self) -> Option<&mut LocalTestRecord> {
        match &mut self.record {
            LocalRecord::Parsed(record) => Some(record),
            LocalRecord::Unreadable { .. } => None,
        }
    }

    pub fn remote_id(&self) -> Option<&RemoteId> {
        self.parsed().and_then(LocalTestRecord::remote_id)
    }
}

/// All local records of a project, keyed by alias (file stem).
pub type LocalRecords = BTreeMap<Alias, LocalEntry>;

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<root>/.keel/tests/`: pure, no I/O.
pub fn tests_dir_at(root: &Path) -> PathBuf {
    keel_dir_path_at(root).join("tests")
}

/// `<root>/.keel/tests/<alias>.yaml`: pure, no I/O.
pub fn record_path_at(root: &Path, alias: &Alias) -> PathBuf {
    tests_dir_at(root).join(format!("{}.yaml", alias.0))
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load every `*.yaml` record under `<root>/.keel/tests/`.
///
/// A missing directory yields an empty map. Files that fail to read or parse
/// are returned as [`LocalRecord::Unreadable`] rather than skipped.
pub fn load_local_records_at(root: &Path) -> Result<LocalRecords, StoreError> {
    let dir = tests_dir_at(root);
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(LocalRecords::new()),
        Err(err) => return Err(io_err(&dir, err)),
    };

    let mut records = LocalRecords::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(&dir, e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("yaml") {
            continue;
        }
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let record = match load_record(&path) {
            Ok(record) => LocalRecord::Parsed(record),
            Err(err) => LocalRecord::Unreadable {
                reason: err.to_string(),
            },
        };
        records.insert(Alias::from(stem), LocalEntry { path, record });
    }
    Ok(records)
}

/// Load a single record file.
pub fn load_record(path: &Path) -> Result<LocalTestRecord, StoreError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Find the record for `alias`: by exact alias first, then by its sanitized
/// form. Returns the entry (if loaded) and the path it lives or would live at.
pub fn locate<'a>(
    records: &'a LocalRecords,
    root: &Path,
    alias: &Alias,
) -> (Option<&'a LocalEntry>, PathBuf) {
    if let Some(entry) = records.get(alias) {
        return (Some(entry), entry.path.clone());
    }
    let sanitized = crate::alias::sanitize(&alias.0);
    if !sanitized.is_empty() {
        let key = Alias::from(sanitized);
        if let Some(entry) = records.get(&key) {
            return (Some(entry), entry.path.clone());
        }
        return (None, record_path_at(root, &key));
    }
    (None, record_path_at(root, alias))
}

// ---------------------------------------------------------------------------
// Save / remove
// ---------------------------------------------------------------------------

/// Atomically save a record, refreshing its checksum first.
///
/// Write flow: checksum → serialize → `<path>.tmp` → `rename`.
pub fn save_record(path: &Path, record: &mut LocalTestRecord) -> Result<(), StoreError> {
    record.meta.checksum = Some(checksum(&record.test));

    let yaml = serde_yaml::to_string(record)?;
    let content = format!(
        "# keel test definition\n# Last saved: {}\n\n{yaml}",
        Utc::now().to_rfc3339()
    );

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Delete a record file. Returns `false` if it was already gone.
pub fn remove_record(path: &Path) -> Result<bool, StoreError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(io_err(path, err)),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
