//! Project root and registry access resolution.
//!
//! Precedence for the API key and URL: command-line flag, then environment
//! (`KEEL_API_KEY`, `KEEL_API_URL`, both bound through clap), then
//! `~/.keel/credentials.yaml`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use keel_core::credentials::{self, Credentials};
use keel_core::manifest;

pub const DEFAULT_API_URL: &str = "https://api.keel.dev";

/// Options shared by every subcommand that talks to the registry.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Project directory (defaults to the nearest ancestor holding `.keel/`).
    #[arg(long, global = true, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Registry base URL.
    #[arg(long, global = true, env = "KEEL_API_URL", value_name = "URL")]
    pub api_url: Option<String>,

    /// Registry API key.
    #[arg(long, global = true, env = "KEEL_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

/// Resolved registry endpoint and key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    pub api_url: String,
    pub api_key: String,
}

impl GlobalArgs {
    /// Project root: `--project-dir` as given, otherwise searched upward from
    /// the working directory.
    pub fn project_root(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.project_dir {
            return Ok(dir.clone());
        }
        let cwd = std::env::current_dir().context("cannot read the current directory")?;
        manifest::find_project_root(&cwd).context("run `keel init` to create a project")
    }

    /// Resolve the registry endpoint, reading stored credentials when a flag
    /// or environment variable does not supply the key.
    pub fn registry(&self) -> Result<RegistryConfig> {
        let stored = match &self.api_key {
            Some(key) if !key.trim().is_empty() => None,
            _ => credentials::load_credentials().context("failed to read stored credentials")?,
        };
        resolve(self.api_key.as_deref(), self.api_url.as_deref(), stored)
    }
}

fn resolve(
    flag_key: Option<&str>,
    flag_url: Option<&str>,
    stored: Option<Credentials>,
) -> Result<RegistryConfig> {
    let flag_key = flag_key.map(str::trim).filter(|k| !k.is_empty());
    let flag_url = flag_url.map(str::trim).filter(|u| !u.is_empty());

    let api_key = match (flag_key, &stored) {
        (Some(key), _) => key.to_string(),
        (None, Some(creds)) if !creds.api_key.trim().is_empty() => creds.api_key.trim().to_string(),
        _ => bail!(
            "no API key: pass --api-key, set KEEL_API_KEY, or add api_key to {}",
            credentials_hint()
        ),
    };
    let api_url = flag_url
        .map(str::to_string)
        .or_else(|| stored.and_then(|c| c.api_url))
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    Ok(RegistryConfig {
        api_url: api_url.trim_end_matches('/').to_string(),
        api_key,
    })
}

fn credentials_hint() -> String {
    dirs::home_dir()
        .map(|home| credentials::credentials_path_at(&home))
        .unwrap_or_else(|| Path::new("~/.keel/credentials.yaml").to_path_buf())
        .display()
        .to_string()
}
