//! List every configured fleet entry with its declared version, last-updated
//! time, and whether it is a full workflow or a tool-only bundle.

use anyhow::Result;
use clap::{Args, ValueEnum};
use serde::Serialize;
use tracing::warn;

use crate::config::Config;
use crate::constants::{KEY_WORKFLOW_NAME, KEY_WORKFLOW_VERSION};
use crate::makeparams::ParamSet;

/// Output format for the listing.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable columns.
    Table,
    /// Machine-readable JSON array.
    Json,
}

/// Arguments for `wfdeploy manifest`.
#[derive(Args)]
pub struct ManifestCommand {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct ManifestEntry {
    name: String,
    version: Option<String>,
    last_updated: String,
    workflow: bool,
}

impl ManifestCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        let mut entries = Vec::new();
        for workflow in &config.fleet.workflows {
            let dir = config.repo_root().join(workflow);
            let params = match ParamSet::read(&dir) {
                Ok(params) => params,
                Err(e) => {
                    warn!("{workflow}: {e:#}");
                    continue;
                }
            };

            // A directory with component XMLs is a workflow; one that only
            // carries a tools/ tree is a tool-only bundle.
            let is_workflow =
                dir.join("flow.xml").is_file() || dir.join("input.xml").is_file();

            entries.push(ManifestEntry {
                name: params.get(KEY_WORKFLOW_NAME).unwrap_or(workflow.as_str()).to_string(),
                version: params.get(KEY_WORKFLOW_VERSION).map(ToString::to_string),
                last_updated: params.modified.format("%Y-%m-%d %H:%M:%S").to_string(),
                workflow: is_workflow,
            });
        }

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
            OutputFormat::Table => {
                println!("{:<30} {:<12} {:<20} {}", "NAME", "VERSION", "UPDATED", "KIND");
                for entry in &entries {
                    println!(
                        "{:<30} {:<12} {:<20} {}",
                        entry.name,
                        entry.version.as_deref().unwrap_or("-"),
                        entry.last_updated,
                        if entry.workflow { "workflow" } else { "tool-only" }
                    );
                }
            }
        }
        Ok(())
    }
}
