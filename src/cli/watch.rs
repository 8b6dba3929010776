//! Wait for a portal task to reach a terminal state.

use anyhow::Result;
use clap::Args;
use std::time::Duration;

use crate::config::Config;
use crate::constants::{DEFAULT_MAX_WAIT, POLL_INTERVAL};
use crate::core::WfdError;
use crate::portal::{PortalClient, TaskState};

/// Arguments for `wfdeploy watch`.
#[derive(Args)]
pub struct WatchCommand {
    /// Portal task id to watch
    pub task_id: String,

    /// Maximum seconds to wait before giving up
    #[arg(long)]
    pub max_wait: Option<u64>,
}

impl WatchCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        let portal_config = config.portal.clone().ok_or_else(|| WfdError::Other {
            message: "watch requires a [portal] section in wfdeploy.toml".to_string(),
        })?;
        let client = PortalClient::new(portal_config)?;

        let max_wait = self.max_wait.map_or(DEFAULT_MAX_WAIT, Duration::from_secs);
        let state =
            client.wait_for_completion(&self.task_id, POLL_INTERVAL, max_wait).await?;

        match state {
            TaskState::Done => {
                println!("Task {} finished: DONE", self.task_id);
                Ok(())
            }
            other => Err(WfdError::Other {
                message: format!("task {} ended with status {other:?}", self.task_id),
            }
            .into()),
        }
    }
}
