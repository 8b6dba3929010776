//! Command-line interface for wfdeploy.
//!
//! Each command lives in its own module with its own argument struct and
//! execution logic:
//!
//! - `deploy` - render and publish one workflow (and its tool bundle)
//! - `deploy-all` - publish every workflow in the configured fleet
//! - `deps` - report (or rewrite) dependency drift for one workflow
//! - `exists` - check whether a tool version is already on the target
//! - `manifest` - list every configured entry with version and timestamps
//! - `watch` - poll a portal task until it reaches a terminal state
//! - `regress` - re-run a recorded task and compare result counts with a
//!   baseline run
//!
//! All commands exit 1 through `main` on any unrecoverable failure and 0
//! otherwise. Global flags: `--verbose`, `--quiet`, `--config <path>`.

mod deploy;
mod deploy_all;
mod deps;
mod exists;
mod manifest;
mod regress;
mod watch;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Top-level argument parser.
#[derive(Parser)]
#[command(name = "wfdeploy", version, about = "Deploy versioned workflows and tool bundles")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to a specific wfdeploy.toml (default: search upward from cwd)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Deploy one workflow directory
    Deploy(deploy::DeployCommand),
    /// Deploy every workflow in the configured fleet
    DeployAll(deploy_all::DeployAllCommand),
    /// Report or rewrite dependency drift for one workflow
    Deps(deps::DepsCommand),
    /// Check whether a tool version already exists on the target
    Exists(exists::ExistsCommand),
    /// List every configured entry with version and last-updated time
    Manifest(manifest::ManifestCommand),
    /// Wait for a portal task to reach a terminal state
    Watch(watch::WatchCommand),
    /// Re-run a recorded task and compare result counts with a baseline
    Regress(regress::RegressCommand),
}

impl Cli {
    /// Initializes logging and dispatches to the selected command.
    pub async fn execute(self) -> Result<()> {
        self.init_tracing();

        let config = match &self.config {
            Some(path) => Config::load_path(path)?,
            None => Config::load()?,
        };

        match self.command {
            Commands::Deploy(cmd) => cmd.execute(&config).await,
            Commands::DeployAll(cmd) => cmd.execute(&config).await,
            Commands::Deps(cmd) => cmd.execute(&config).await,
            Commands::Exists(cmd) => cmd.execute(&config).await,
            Commands::Manifest(cmd) => cmd.execute(&config).await,
            Commands::Watch(cmd) => cmd.execute(&config).await,
            Commands::Regress(cmd) => cmd.execute(&config).await,
        }
    }

    fn init_tracing(&self) {
        let default = if self.quiet {
            "error"
        } else if self.verbose {
            "wfdeploy=debug"
        } else {
            "wfdeploy=info"
        };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        // Logs go to stderr; stdout is reserved for command output so that
        // `manifest --format json` and friends stay machine-parseable.
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}
