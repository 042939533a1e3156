//! Structured run result: per-domain items plus a summary count table.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::policy::{Action, Decision};

/// One reported entry (alias, platform key, or provider mapping).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncItem {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub action: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub prompted: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl SyncItem {
    pub fn new(name: impl Into<String>, id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            status: status.into(),
            ..Self::default()
        }
    }

    /// A domain-level failure (listing, loading, persisting).
    pub fn failure(name: impl Into<String>, action: Action, error: impl ToString) -> Self {
        Self {
            name: name.into(),
            status: "error".to_string(),
            action: action.as_str().to_string(),
            error: error.to_string(),
            ..Self::default()
        }
    }

    pub fn set_action(&mut self, action: Action, dry_run: bool) {
        self.action = action.label(dry_run);
    }

    pub fn set_decision(&mut self, decision: Decision, dry_run: bool) {
        self.set_action(decision.action, dry_run);
        self.prompted = decision.prompted;
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }
}

/// Result of one domain reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainReport {
    pub items: Vec<SyncItem>,
    /// The in-memory manifest was mutated.
    pub changed: bool,
}

impl DomainReport {
    pub fn push(&mut self, item: SyncItem) {
        self.items.push(item);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(SyncItem::has_error)
    }
}

/// Everything a `sync` run reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub mode: String,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<SyncItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub workflows: Vec<SyncItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub app_links: Vec<SyncItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hotreload_checks: Vec<SyncItem>,
    pub summary: BTreeMap<String, usize>,
}

impl SyncReport {
    /// Sections in render order with their display titles.
    pub fn sections(&self) -> [(&'static str, &[SyncItem]); 4] {
        [
            ("Tests", self.tests.as_slice()),
            ("Workflows", self.workflows.as_slice()),
            ("App Links", self.app_links.as_slice()),
            ("Hot Reload", self.hotreload_checks.as_slice()),
        ]
    }

    fn all_items(&self) -> impl Iterator<Item = &SyncItem> {
        self.tests
            .iter()
            .chain(&self.workflows)
            .chain(&self.app_links)
            .chain(&self.hotreload_checks)
    }

    /// True if any item carries an error.
    pub fn has_errors(&self) -> bool {
        self.all_items().any(SyncItem::has_error)
    }

    /// Per-domain counts, `status_<s>`, `action_<a>` and `errors`.
    pub fn compute_summary(&self) -> BTreeMap<String, usize> {
        let mut summary = BTreeMap::new();
        summary.insert("tests".to_string(), self.tests.len());
        summary.insert("workflows".to_string(), self.workflows.len());
        summary.insert("app_links".to_string(), self.app_links.len());
        summary.insert("hotreload_checks".to_string(), self.hotreload_checks.len());

        for item in self.all_items() {
            let status = item.status.trim();
            if status.is_empty() {
                continue;
            }
            *summary.entry(format!("status_{status}")).or_insert(0) += 1;
            if !item.action.is_empty() {
                *summary.entry(format!("action_{}", item.action)).or_insert(0) += 1;
            }
            if item.has_error() {
                *summary.entry("errors".to_string()).or_insert(0) += 1;
            }
        }
        summary
    }
}
