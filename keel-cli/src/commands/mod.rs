//! Subcommand implementations. Each exposes a clap `Args` struct with
//! `run(self, &GlobalArgs)`.

pub mod diff;
pub mod init;
pub mod status;
pub mod sync;
