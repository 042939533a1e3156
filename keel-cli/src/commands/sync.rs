//! `keel sync`: reconcile the project manifest with the registry.

use std::io::IsTerminal;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::{ColoredString, Colorize};

use keel_sync::{
    DomainSelection, Interactivity, NonInteractive, Prompter, RunOptions, SyncItem, SyncReport,
};

use crate::client::HttpRegistry;
use crate::config::GlobalArgs;
use crate::prompt::TerminalPrompter;

/// Arguments for `keel sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Reconcile tests (no domain flag means all domains).
    #[arg(long)]
    pub tests: bool,

    /// Reconcile workflows.
    #[arg(long)]
    pub workflows: bool,

    /// Validate and repair build platform app links.
    #[arg(long)]
    pub apps: bool,

    /// Require prompts; fails without a TTY on stdin.
    #[arg(long, conflicts_with = "non_interactive")]
    pub interactive: bool,

    /// Never prompt; use the default action for every decision.
    #[arg(long)]
    pub non_interactive: bool,

    /// Apply destructive defaults (detach, prune, clear) without asking.
    #[arg(long)]
    pub prune: bool,

    /// Report what would change without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip hot reload provider mapping checks.
    #[arg(long)]
    pub skip_hotreload_check: bool,

    /// Emit the report as JSON (implies non-interactive).
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let prompt = Interactivity {
            interactive: self.interactive,
            non_interactive: self.non_interactive,
            json: self.json,
            stdin_tty: std::io::stdin().is_terminal(),
        }
        .resolve()?;

        let root = global.project_root()?;
        let registry = HttpRegistry::new(&global.registry()?);
        let selection = DomainSelection::from_flags(
            self.tests,
            self.workflows,
            self.apps,
            self.skip_hotreload_check,
        );
        let options = RunOptions {
            prompt,
            prune: self.prune,
            dry_run: self.dry_run,
        };

        let mut prompter: Box<dyn Prompter> = if prompt {
            Box::new(TerminalPrompter::stdio())
        } else {
            Box::new(NonInteractive)
        };
        let report = keel_sync::run(&root, &registry, prompter.as_mut(), selection, options)
            .with_context(|| format!("sync failed for '{}'", root.display()))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize sync report")?
            );
        } else {
            print_report(&report);
        }

        if report.has_errors() {
            let errors = report.summary.get("errors").copied().unwrap_or(0);
            bail!("sync finished with {errors} error(s)");
        }
        Ok(())
    }
}

fn print_report(report: &SyncReport) {
    println!("Sync mode: {}", report.mode);
    if report.dry_run {
        println!("{}", "[dry-run] no files will be written".yellow());
    }

    for (title, items) in report.sections() {
        if items.is_empty() {
            continue;
        }
        println!("\n{}", title.bold());
        for item in items {
            println!("  - {}", item_line(item));
        }
    }

    if !report.summary.is_empty() {
        println!("\n{}", "Summary".bold());
        for (key, count) in &report.summary {
            println!("  {key}: {count}");
        }
    }
}

fn item_line(item: &SyncItem) -> String {
    let tag = if item.action.is_empty() {
        item.status.clone()
    } else {
        format!("{}/{}", item.status, item.action)
    };
    let mut line = format!("{} [{}]", item.name, status_color(&item.status, &tag));
    if !item.id.is_empty() {
        line.push(' ');
        line.push_str(&item.id.chars().take(8).collect::<String>());
    }
    if item.prompted {
        line.push_str(" (prompted)");
    }
    if !item.message.is_empty() {
        line.push_str(" — ");
        line.push_str(&item.message);
    }
    if !item.error.is_empty() {
        line.push_str(" | ");
        line.push_str(&item.error.red().to_string());
    }
    line
}

fn status_color(status: &str, text: &str) -> ColoredString {
    match status {
        "synced" => text.green(),
        "outdated" | "modified" | "remote-only" | "local-only" | "warning" => text.yellow(),
        "stale" | "orphaned" | "duplicate" | "mismatch" => text.magenta(),
        "conflict" | "error" => text.red(),
        _ => text.normal(),
    }
}
