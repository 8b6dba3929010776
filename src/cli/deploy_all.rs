//! Deploy every workflow in the configured fleet, sequentially, isolating
//! per-workflow failures so one broken workflow does not strand the rest.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use tracing::error;

use crate::cli::deploy::deploy_one;
use crate::config::Config;
use crate::core::WfdError;

/// Arguments for `wfdeploy deploy-all`.
#[derive(Args)]
pub struct DeployAllCommand {
    /// Deploy into privileged production paths
    #[arg(long)]
    pub production: bool,
}

impl DeployAllCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        if config.fleet.workflows.is_empty() {
            return Err(WfdError::Other {
                message: "deploy-all requires a [fleet] workflows list in wfdeploy.toml"
                    .to_string(),
            }
            .into());
        }

        let mut failures: Vec<(String, String)> = Vec::new();
        for workflow in &config.fleet.workflows {
            let dir = config.repo_root().join(workflow);
            println!("{} {workflow}", "Deploying".cyan().bold());
            // Failures are aggregated; the fleet loop always runs to the end.
            if let Err(e) = deploy_one(config, &dir, self.production, true, true).await {
                error!("{workflow}: {e:#}");
                failures.push((workflow.clone(), format!("{e:#}")));
            }
        }

        if failures.is_empty() {
            println!("{} {} workflow(s)", "Deployed".green().bold(), config.fleet.workflows.len());
            return Ok(());
        }

        for (workflow, reason) in &failures {
            eprintln!("{} {workflow}: {reason}", "Failed".red().bold());
        }
        Err(WfdError::Other {
            message: format!("{} of {} workflow(s) failed", failures.len(), config.fleet.workflows.len()),
        }
        .into())
    }
}
