//! `keel status`: read-only per-test sync status.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use keel_sync::classifier::{self, format_datetime_age, Classification};
use keel_sync::TestStatus;

use crate::client::HttpRegistry;
use crate::config::GlobalArgs;

/// Arguments for `keel status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let root = global.project_root()?;
        let registry = HttpRegistry::new(&global.registry()?);
        let statuses = classifier::status_at(&root, &registry)
            .with_context(|| format!("status check failed for '{}'", root.display()))?;

        if self.json {
            print_json(&statuses)?;
        } else {
            print_table(&statuses);
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct StatusReportJson {
    summary: BTreeMap<&'static str, usize>,
    tests: Vec<TestStatusJson>,
}

#[derive(Serialize)]
struct TestStatusJson {
    alias: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    local_version: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_version: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_synced_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "alias")]
    alias: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "remote id")]
    remote_id: String,
    #[tabled(rename = "local")]
    local: String,
    #[tabled(rename = "remote")]
    remote: String,
    #[tabled(rename = "last sync")]
    last_sync: String,
}

fn counts(statuses: &[TestStatus]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for status in statuses {
        *counts.entry(status.label()).or_insert(0) += 1;
    }
    counts
}

fn print_json(statuses: &[TestStatus]) -> Result<()> {
    let payload = StatusReportJson {
        summary: counts(statuses),
        tests: statuses
            .iter()
            .map(|s| TestStatusJson {
                alias: s.alias.to_string(),
                status: s.label(),
                remote_id: s.remote_id.as_ref().map(|id| id.to_string()),
                local_version: s.local_version,
                remote_version: s.remote_version,
                last_synced_at: s.last_synced_at,
                error: match s.classification() {
                    Classification::Failed(err) => Some(err),
                    _ => None,
                },
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(statuses: &[TestStatus]) {
    let summary = counts(statuses)
        .into_iter()
        .map(|(label, n)| format!("{n} {label}"))
        .collect::<Vec<_>>()
        .join(" | ");
    println!(
        "keel v{} | {} tests{}",
        env!("CARGO_PKG_VERSION"),
        statuses.len(),
        if summary.is_empty() {
            String::new()
        } else {
            format!(" | {summary}")
        }
    );

    if statuses.is_empty() {
        println!("No tests in this project.");
        return;
    }

    let rows: Vec<StatusTableRow> = statuses
        .iter()
        .map(|s| StatusTableRow {
            alias: s.alias.to_string(),
            status: s.label().to_uppercase(),
            remote_id: s
                .remote_id
                .as_ref()
                .map(|id| id.short(8).to_string())
                .unwrap_or_else(|| "-".to_string()),
            local: version(s.local_version),
            remote: version(s.remote_version),
            last_sync: s
                .last_synced_at
                .map(format_datetime_age)
                .unwrap_or_else(|| "never".to_string()),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let attention = statuses
        .iter()
        .filter(|s| !matches!(s.label(), "synced" | "local-only"))
        .count();
    if attention > 0 {
        println!(
            "{}",
            format!("{attention} test(s) need attention. Run 'keel sync' to reconcile.").yellow()
        );
    }
}

fn version(v: Option<u64>) -> String {
    v.map(|v| format!("v{v}")).unwrap_or_else(|| "-".to_string())
}
