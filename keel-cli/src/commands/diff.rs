//! `keel diff <alias>`: unified diff between local and registry content.

use anyhow::{Context, Result};
use clap::Args;

use keel_core::Alias;
use keel_sync::diff::diff_test;

use crate::client::HttpRegistry;
use crate::config::GlobalArgs;

/// Arguments for `keel diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Test alias to diff.
    pub alias: String,
}

impl DiffArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let root = global.project_root()?;
        let registry = HttpRegistry::new(&global.registry()?);
        let alias = Alias::from(self.alias.as_str());

        let diff = diff_test(&root, &registry, &alias)
            .with_context(|| format!("diff failed for '{alias}'"))?;

        if diff.is_empty() {
            println!(
                "No differences for '{alias}' (local v{}, remote v{}).",
                diff.local_version, diff.remote_version
            );
            return Ok(());
        }

        print!("{}", diff.unified_diff);
        if !diff.unified_diff.ends_with('\n') {
            println!();
        }
        Ok(())
    }
}
