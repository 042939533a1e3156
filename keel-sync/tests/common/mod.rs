//! Shared fixtures: an in-memory registry, a scripted prompter, and project
//! scaffolding helpers.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

use tempfile::TempDir;

use keel_core::records::{self, LocalTestRecord, TestBlock, TestDefinition, TestMeta, TestMetadata};
use keel_core::{manifest, Alias, BuildPlatform, Platform, ProjectManifest, RemoteId};
use keel_sync::prompt::Choice;
use keel_sync::remote::{
    PushReceipt, RemoteApp, RemoteTest, RemoteTestSummary, RemoteWorkflowSummary,
};
use keel_sync::{DomainSelection, Prompter, RemoteError, RemoteRegistry, RunOptions, SyncError, SyncReport};

// ---------------------------------------------------------------------------
// Fake registry
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeRegistry {
    tests: RefCell<BTreeMap<RemoteId, RemoteTest>>,
    /// Listed but not fetchable (or fetch fails per `get_errors`).
    listed_only: Vec<RemoteTestSummary>,
    /// Fetchable but missing from the listing.
    unlisted: BTreeSet<RemoteId>,
    get_errors: BTreeMap<RemoteId, RemoteError>,
    push_errors: BTreeMap<RemoteId, RemoteError>,
    list_error: Option<RemoteError>,
    workflows: Vec<RemoteWorkflowSummary>,
    apps: Vec<RemoteApp>,
    pub pushes: RefCell<Vec<(RemoteId, u64)>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test(self, id: &str, name: &str, version: u64) -> Self {
        self.with_test_blocks(id, name, version, vec![step("Open the app")])
    }

    pub fn with_test_blocks(self, id: &str, name: &str, version: u64, blocks: Vec<TestBlock>) -> Self {
        self.tests.borrow_mut().insert(
            RemoteId::from(id),
            RemoteTest {
                id: RemoteId::from(id),
                name: name.to_string(),
                platform: "iOS".to_string(),
                version,
                blocks,
                build_name: None,
                pinned_version: None,
            },
        );
        self
    }

    /// Listed under `name`, but fetching it fails with `err`.
    pub fn with_unreachable(mut self, id: &str, name: &str, err: RemoteError) -> Self {
        self.listed_only.push(RemoteTestSummary {
            id: RemoteId::from(id),
            name: name.to_string(),
            platform: "ios".to_string(),
        });
        self.get_errors.insert(RemoteId::from(id), err);
        self
    }

    pub fn hide_from_listing(mut self, id: &str) -> Self {
        self.unlisted.insert(RemoteId::from(id));
        self
    }

    pub fn fail_push(mut self, id: &str, err: RemoteError) -> Self {
        self.push_errors.insert(RemoteId::from(id), err);
        self
    }

    pub fn fail_listing(mut self, err: RemoteError) -> Self {
        self.list_error = Some(err);
        self
    }

    pub fn with_workflow(mut self, id: &str, name: &str) -> Self {
        self.workflows.push(RemoteWorkflowSummary {
            id: RemoteId::from(id),
            name: name.to_string(),
        });
        self
    }

    pub fn with_app(mut self, id: &str, name: &str, platform: &str) -> Self {
        self.apps.push(RemoteApp {
            id: RemoteId::from(id),
            name: name.to_string(),
            platform: platform.to_string(),
        });
        self
    }

    pub fn remote_test(&self, id: &str) -> RemoteTest {
        self.tests.borrow()[&RemoteId::from(id)].clone()
    }
}

impl RemoteRegistry for FakeRegistry {
    fn list_tests(&self) -> Result<Vec<RemoteTestSummary>, RemoteError> {
        if let Some(err) = &self.list_error {
            return Err(err.clone());
        }
        let mut listed: Vec<RemoteTestSummary> = self
            .tests
            .borrow()
            .values()
            .filter(|t| !self.unlisted.contains(&t.id))
            .map(|t| RemoteTestSummary {
                id: t.id.clone(),
                name: t.name.clone(),
                platform: t.platform.clone(),
            })
            .collect();
        listed.extend(self.listed_only.iter().cloned());
        Ok(listed)
    }

    fn list_workflows(&self) -> Result<Vec<RemoteWorkflowSummary>, RemoteError> {
        Ok(self.workflows.clone())
    }

    fn get_test(&self, id: &RemoteId) -> Result<RemoteTest, RemoteError> {
        if let Some(err) = self.get_errors.get(id) {
            return Err(err.clone());
        }
        self.tests
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(format!("test {id}")))
    }

    fn push_test(
        &self,
        id: &RemoteId,
        test: &TestDefinition,
        expected_version: u64,
    ) -> Result<PushReceipt, RemoteError> {
        if let Some(err) = self.push_errors.get(id) {
            return Err(err.clone());
        }
        let mut tests = self.tests.borrow_mut();
        let remote = tests
            .get_mut(id)
            .ok_or_else(|| RemoteError::NotFound(format!("test {id}")))?;
        if expected_version < remote.version {
            return Err(RemoteError::Conflict(format!("registry is at {}", remote.version)));
        }
        remote.version += 1;
        remote.blocks = test.blocks.clone();
        self.pushes.borrow_mut().push((id.clone(), expected_version));
        Ok(PushReceipt {
            version: remote.version,
        })
    }

    fn get_app(&self, id: &RemoteId) -> Result<RemoteApp, RemoteError> {
        self.apps
            .iter()
            .find(|app| &app.id == id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(format!("app {id}")))
    }

    fn list_apps(&self, platform: Option<Platform>) -> Result<Vec<RemoteApp>, RemoteError> {
        Ok(self
            .apps
            .iter()
            .filter(|app| platform.map_or(true, |p| Platform::parse(&app.platform) == Some(p)))
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Scripted prompter
// ---------------------------------------------------------------------------

/// Answers from a queue; falls back to the default once exhausted.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<usize>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn answering(answers: &[usize]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            asked: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn choose(&mut self, prompt: &str, _options: &[Choice], default: usize) -> Result<usize, SyncError> {
        self.asked.push(prompt.to_string());
        Ok(self.answers.pop_front().unwrap_or(default))
    }
}

// ---------------------------------------------------------------------------
// Project scaffolding
// ---------------------------------------------------------------------------

pub fn step(description: &str) -> TestBlock {
    TestBlock {
        kind: "instructions".to_string(),
        step_description: Some(description.to_string()),
        ..TestBlock::default()
    }
}

/// A project with `.keel/config.yaml` holding `tests`.
pub fn project(tests: &[(&str, &str)]) -> TempDir {
    let root = TempDir::new().expect("tempdir");
    let mut m = ProjectManifest::new("shop");
    for (alias, id) in tests {
        m.tests.insert(Alias::from(*alias), RemoteId::from(*id));
    }
    manifest::save_manifest_at(root.path(), &m).expect("save manifest");
    root
}

pub fn edit_manifest(root: &Path, edit: impl FnOnce(&mut ProjectManifest)) {
    let mut m = manifest::load_manifest_at(root).expect("load manifest");
    edit(&mut m);
    manifest::save_manifest_at(root, &m).expect("save manifest");
}

pub fn load(root: &Path) -> ProjectManifest {
    manifest::load_manifest_at(root).expect("load manifest")
}

pub fn link_app(root: &Path, key: &str, app_id: &str) {
    edit_manifest(root, |m| {
        m.build.platforms.insert(
            key.to_string(),
            BuildPlatform {
                command: "make build".to_string(),
                output: "build/app".to_string(),
                app_id: RemoteId::from(app_id),
            },
        );
    });
}

/// Write a synced record for `alias` (checksum matches, versions equal).
pub fn write_record(root: &Path, alias: &str, remote_id: Option<&str>, remote_version: u64, local_version: u64) {
    let path = records::record_path_at(root, &Alias::from(alias));
    let mut record = LocalTestRecord {
        meta: TestMeta {
            remote_id: remote_id.map(RemoteId::from),
            remote_version,
            local_version,
            last_synced_at: None,
            checksum: None,
        },
        test: TestDefinition {
            metadata: TestMetadata {
                name: alias.to_string(),
                platform: Some("ios".to_string()),
                description: None,
            },
            build: None,
            blocks: vec![step("Open the app")],
        },
    };
    records::save_record(&path, &mut record).expect("save record");
}

pub fn read_record(root: &Path, alias: &str) -> LocalTestRecord {
    records::load_record(&records::record_path_at(root, &Alias::from(alias))).expect("load record")
}

pub fn record_exists(root: &Path, alias: &str) -> bool {
    records::record_path_at(root, &Alias::from(alias)).exists()
}

pub fn opts(prompt: bool, prune: bool, dry_run: bool) -> RunOptions {
    RunOptions {
        prompt,
        prune,
        dry_run,
    }
}

pub fn sync(root: &Path, registry: &FakeRegistry, prompter: &mut dyn Prompter, options: RunOptions) -> SyncReport {
    keel_sync::run(root, registry, prompter, DomainSelection::all(), options).expect("run")
}

pub fn sync_default(root: &Path, registry: &FakeRegistry, options: RunOptions) -> SyncReport {
    sync(root, registry, &mut keel_sync::NonInteractive, options)
}

pub fn item<'r>(items: &'r [keel_sync::SyncItem], name: &str, status: &str) -> &'r keel_sync::SyncItem {
    items
        .iter()
        .find(|i| i.name == name && i.status == status)
        .unwrap_or_else(|| panic!("no item {name} [{status}] in {items:#?}"))
}
