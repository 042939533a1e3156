//! `keel init [--name <name>]`

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use keel_core::manifest;

use crate::config::GlobalArgs;

/// Create `.keel/config.yaml` in the project directory.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project name (defaults to the directory name).
    #[arg(long, short = 'n')]
    pub name: Option<String>,
}

impl InitArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let root = match &global.project_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("cannot read the current directory")?,
        };
        let name = self.name.unwrap_or_else(|| directory_name(&root));
        let path = manifest::manifest_path_at(&root);

        if path.exists() {
            let existing = manifest::load_manifest_at(&root)
                .with_context(|| format!("existing manifest at '{}' is unreadable", path.display()))?;
            println!(
                "✓ '{}' is already a keel project ({})",
                existing.project.name,
                path.display()
            );
            return Ok(());
        }

        manifest::init_at(&root, &name)
            .with_context(|| format!("failed to init '{}'", root.display()))?;
        println!("✓ Initialized keel project '{name}'");
        println!("  Manifest: {}", path.display());
        Ok(())
    }
}

fn directory_name(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(root)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "keel-project".to_string())
}
