//! keel: reconcile a local test project with the remote registry.
//!
//! # Usage
//!
//! ```text
//! keel init [--name <name>]
//! keel sync [--tests] [--workflows] [--apps] [--prune] [--dry-run]
//!           [--interactive | --non-interactive] [--skip-hotreload-check] [--json]
//! keel status [--json]
//! keel diff <alias>
//! ```
//!
//! Global: `--project-dir`, `--api-url` (`KEEL_API_URL`), `--api-key`
//! (`KEEL_API_KEY`). Logs go to stderr, filtered by `KEEL_LOG`.

mod client;
mod commands;
mod config;
mod prompt;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{diff::DiffArgs, init::InitArgs, status::StatusArgs, sync::SyncArgs};
use config::GlobalArgs;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "keel",
    version,
    about = "Keep a local test project in sync with the remote registry",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create `.keel/config.yaml` in the project directory.
    Init(InitArgs),

    /// Reconcile tests, workflows, app links and hot reload mappings.
    Sync(SyncArgs),

    /// Show the sync status of every test.
    Status(StatusArgs),

    /// Show a unified diff between a local test and its registry copy.
    Diff(DiffArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    match cli.command {
        Commands::Init(args) => args.run(&cli.global),
        Commands::Sync(args) => args.run(&cli.global),
        Commands::Status(args) => args.run(&cli.global),
        Commands::Diff(args) => args.run(&cli.global),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_env("KEEL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
