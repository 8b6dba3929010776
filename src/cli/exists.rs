//! Check whether a specific tool version already exists on the target.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::channel::Channel;
use crate::config::Config;
use crate::core::WfdError;
use crate::deploy::Deployer;

/// Arguments for `wfdeploy exists`.
#[derive(Args)]
pub struct ExistsCommand {
    /// Tool folder name
    pub tool: String,
    /// Version to look for
    pub version: String,
}

impl ExistsCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        let channel = Channel::from_target(&config.target);
        let deployer = Deployer::new(&channel, &config.target);

        if deployer.tool_version_exists(&self.tool, &self.version).await? {
            println!("{} {}/{} is deployed", "Found:".green().bold(), self.tool, self.version);
            Ok(())
        } else {
            // Absence exits 1 so scripts can branch on the result.
            Err(WfdError::Other {
                message: format!("{}/{} is not deployed", self.tool, self.version),
            }
            .into())
        }
    }
}
