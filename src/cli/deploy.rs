//! Deploy one workflow directory: render components, publish them, then
//! mirror the tool bundle.

use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;
use tracing::info;

use crate::channel::Channel;
use crate::config::Config;
use crate::deploy::{DeployOptions, Deployer};
use crate::makeparams::WorkflowParams;
use crate::version::effective_version;

/// Arguments for `wfdeploy deploy`.
#[derive(Args)]
pub struct DeployCommand {
    /// Workflow directory (containing a Makefile and component XMLs)
    pub workflow_dir: std::path::PathBuf,

    /// Deploy into privileged production paths
    #[arg(long)]
    pub production: bool,

    /// Do not refresh the default (unqualified) component paths
    #[arg(long)]
    pub no_default: bool,

    /// Skip the tool bundle, deploying only the XML components
    #[arg(long)]
    pub no_tools: bool,
}

impl DeployCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        deploy_one(config, &self.workflow_dir, self.production, !self.no_default, !self.no_tools)
            .await
    }
}

/// Deploys a single workflow directory end to end. Shared with `deploy-all`.
pub(crate) async fn deploy_one(
    config: &Config,
    workflow_dir: &Path,
    production: bool,
    update_default: bool,
    include_tools: bool,
) -> Result<()> {
    let params = WorkflowParams::load(workflow_dir)
        .with_context(|| format!("Failed to read parameters for {}", workflow_dir.display()))?;
    let version = effective_version(&params.version, workflow_dir, production).await;

    let channel = Channel::from_target(&config.target);
    let deployer = Deployer::new(&channel, &config.target);

    deployer
        .deploy_workflow(
            workflow_dir,
            &params,
            &version,
            DeployOptions { production, update_default },
        )
        .await?;

    if include_tools {
        let bundle_dir = workflow_dir.join("tools").join(&params.tool_name);
        if bundle_dir.is_dir() {
            deployer
                .deploy_tool_bundle(&params.tool_name, &version, &bundle_dir, production)
                .await?;
        } else {
            info!("{}: no tool bundle at {}", params.name, bundle_dir.display());
        }
    }

    Ok(())
}
