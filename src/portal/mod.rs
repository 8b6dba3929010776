//! Portal client: submitting, watching and regression-checking tasks on the
//! workflow portal.
//!
//! Deployment itself happens over the execution channel; the portal HTTP
//! API is only consulted afterwards, to clone a recorded task against the
//! freshly deployed version, wait for it to finish, and compare result-view
//! row counts against the baseline run.
//!
//! Polling is fixed-interval with a hard total budget: a task that has not
//! reached a terminal state (`DONE`, `FAILED`, `SUSPENDED`) within the
//! budget is a [`WfdError::PollTimeout`]. A transient status-fetch failure
//! inside the loop is logged and retried on the next tick; only the budget
//! ends the wait.

use anyhow::Result;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::PortalConfig;
use crate::core::WfdError;

/// Terminal states a portal task can settle into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Finished successfully.
    Done,
    /// Finished with an error.
    Failed,
    /// Halted by an operator.
    Suspended,
    /// Still queued or running.
    Running,
}

impl TaskState {
    fn parse(status: &str) -> Self {
        match status {
            "DONE" => Self::Done,
            "FAILED" => Self::Failed,
            "SUSPENDED" => Self::Suspended,
            _ => Self::Running,
        }
    }

    /// Whether the state ends a polling wait.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Suspended)
    }
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ViewPayload {
    #[serde(rename = "blockData", default)]
    block_data: Vec<serde_json::Value>,
}

/// HTTP client for one portal instance.
pub struct PortalClient {
    client: reqwest::Client,
    config: PortalConfig,
}

impl PortalClient {
    /// Builds a client with a cookie store (the portal tracks login sessions
    /// through cookies).
    pub fn new(config: PortalConfig) -> Result<Self> {
        let client = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    /// Signs in with the configured credentials. Required before
    /// [`invoke`](Self::invoke) and [`delete`](Self::delete).
    pub async fn login(&self) -> Result<()> {
        let username = self.config.username.clone().ok_or_else(|| WfdError::TaskSubmissionFailed {
            reason: "no portal username configured".to_string(),
        })?;
        let password = self
            .config
            .password
            .clone()
            .or_else(|| std::env::var("WFDEPLOY_PORTAL_PASSWORD").ok())
            .ok_or_else(|| WfdError::TaskSubmissionFailed {
                reason: "no portal password configured".to_string(),
            })?;

        let form = [("user", username.as_str()), ("password", password.as_str()), ("login", "Sign in")];
        self.client
            .post(self.url("user/login.jsp"))
            .form(&form)
            .send()
            .await?
            .error_for_status()?;
        debug!("logged in to {} as {}", self.config.base_url, username);
        Ok(())
    }

    /// Submits a task with the given form parameters and returns its id.
    ///
    /// The portal answers the submission endpoint with the task id as plain
    /// text; a response outside the plausible id length range means the
    /// submission was rejected (the body is then an error page).
    pub async fn invoke(&self, parameters: &[(String, String)]) -> Result<String> {
        let response = self
            .client
            .post(self.url("InvokeTools"))
            .form(parameters)
            .send()
            .await?
            .error_for_status()?;
        let task_id = response.text().await?.trim().to_string();

        if !plausible_task_id(&task_id) {
            return Err(WfdError::TaskSubmissionFailed {
                reason: format!("implausible task id in response: {task_id:.80}"),
            }
            .into());
        }
        info!("launched task {task_id}");
        Ok(task_id)
    }

    /// Fetches the current state of a task.
    pub async fn status(&self, task_id: &str) -> Result<TaskState> {
        let payload: StatusPayload = self
            .client
            .get(self.url("status_json.jsp"))
            .query(&[("task", task_id)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(TaskState::parse(&payload.status))
    }

    /// Polls until the task reaches a terminal state or `max_wait` elapses.
    pub async fn wait_for_completion(
        &self,
        task_id: &str,
        poll_interval: Duration,
        max_wait: Duration,
    ) -> Result<TaskState> {
        let start = Instant::now();
        loop {
            match self.status(task_id).await {
                Ok(state) if state.is_terminal() => return Ok(state),
                Ok(_) => debug!("waiting for task {task_id}"),
                // Transient portal hiccups do not end the wait.
                Err(e) => warn!("status fetch for {task_id} failed, will retry: {e:#}"),
            }

            if start.elapsed() > max_wait {
                return Err(WfdError::PollTimeout {
                    task_id: task_id.to_string(),
                    max_wait_secs: max_wait.as_secs(),
                }
                .into());
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Number of rows in one result view of a finished task.
    pub async fn view_count(&self, task_id: &str, view: &str) -> Result<usize> {
        let payload: ViewPayload = self
            .client
            .get(self.url("result_json.jsp"))
            .query(&[("task", task_id), ("view", view)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(payload.block_data.len())
    }

    /// Regression check: a re-run task must produce the same number of rows
    /// as its baseline in the given view.
    pub async fn check_view_counts(
        &self,
        old_task: &str,
        new_task: &str,
        view: &str,
    ) -> Result<()> {
        let old_count = self.view_count(old_task, view).await?;
        let new_count = self.view_count(new_task, view).await?;
        if old_count == new_count {
            info!("view '{view}': {old_count} rows in both {old_task} and {new_task}");
            return Ok(());
        }
        Err(WfdError::RegressionCheckFailed {
            old_task: old_task.to_string(),
            new_task: new_task.to_string(),
            view: view.to_string(),
            old_count,
            new_count,
        }
        .into())
    }

    /// Deletes a finished task.
    pub async fn delete(&self, task_id: &str) -> Result<()> {
        self.client
            .get(self.url("Delete"))
            .query(&[("task", task_id)])
            .send()
            .await?
            .error_for_status()?;
        debug!("deleted task {task_id}");
        Ok(())
    }
}

/// Task ids are opaque hex-ish tokens; anything outside this length range is
/// an error page, not an id.
fn plausible_task_id(task_id: &str) -> bool {
    task_id.len() > 4 && task_id.len() < 60 && !task_id.contains('<')
}
