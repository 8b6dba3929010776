//! Re-run a recorded portal task and compare result counts with a baseline.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::constants::{DEFAULT_MAX_WAIT, POLL_INTERVAL};
use crate::core::WfdError;
use crate::portal::{PortalClient, TaskState};

/// Arguments for `wfdeploy regress`.
#[derive(Args)]
pub struct RegressCommand {
    /// Baseline task id whose result counts the re-run must reproduce
    pub baseline: String,

    /// JSON file with the submission parameters for the re-run
    pub params_file: PathBuf,

    /// Result view whose row count is compared between the two tasks
    #[arg(long)]
    pub view: String,

    /// Maximum seconds to wait for the re-run before giving up
    #[arg(long)]
    pub max_wait: Option<u64>,

    /// Keep the re-run task on the portal instead of deleting it
    #[arg(long)]
    pub keep: bool,
}

impl RegressCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        let portal_config = config.portal.clone().ok_or_else(|| WfdError::Other {
            message: "regress requires a [portal] section in wfdeploy.toml".to_string(),
        })?;
        let client = PortalClient::new(portal_config)?;

        let parameters = read_params_file(&self.params_file)?;
        client.login().await?;
        let task_id = client.invoke(&parameters).await?;

        let max_wait = self.max_wait.map_or(DEFAULT_MAX_WAIT, Duration::from_secs);
        let state = client.wait_for_completion(&task_id, POLL_INTERVAL, max_wait).await?;
        if state != TaskState::Done {
            return Err(WfdError::Other {
                message: format!("re-run task {task_id} ended with status {state:?}"),
            }
            .into());
        }

        // Clean up the re-run even when the comparison fails; the check
        // result is what decides the exit status.
        let check = client.check_view_counts(&self.baseline, &task_id, &self.view).await;
        if self.keep {
            info!("keeping re-run task {task_id}");
        } else if let Err(e) = client.delete(&task_id).await {
            warn!("failed to delete re-run task {task_id}: {e:#}");
        }
        check?;

        println!("Regression check passed: view '{}' matches baseline {}", self.view, self.baseline);
        Ok(())
    }
}

/// Reads submission parameters from a JSON object file.
///
/// String values are passed through as-is; numbers and booleans are
/// serialized to their literal form so a hand-written params file does not
/// need to quote everything.
fn read_params_file(path: &Path) -> Result<Vec<(String, String)>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {} as a JSON object", path.display()))?;

    Ok(object
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn params_file_strings_pass_through_unquoted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("params.json");
        fs::write(&path, r#"{"desc":"rerun","workflow":"DEMO"}"#).unwrap();

        let params = read_params_file(&path).unwrap();
        assert!(params.contains(&("desc".to_string(), "rerun".to_string())));
        assert!(params.contains(&("workflow".to_string(), "DEMO".to_string())));
    }

    #[test]
    fn params_file_scalars_become_literals() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("params.json");
        fs::write(&path, r#"{"threads":4,"strict":true}"#).unwrap();

        let params = read_params_file(&path).unwrap();
        assert!(params.contains(&("threads".to_string(), "4".to_string())));
        assert!(params.contains(&("strict".to_string(), "true".to_string())));
    }

    #[test]
    fn non_object_params_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("params.json");
        fs::write(&path, r#"["not","an","object"]"#).unwrap();

        assert!(read_params_file(&path).is_err());
    }
}
