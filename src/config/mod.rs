//! Configuration for wfdeploy (`wfdeploy.toml`).
//!
//! The configuration file lives in the workflow repository root and is found
//! by walking upward from the current directory, the same way a manifest is
//! located by other package tooling. It is parsed into typed structs; every
//! field a command requires is validated up front rather than looked up lazily
//! from a string map.
//!
//! # Example
//!
//! ```toml
//! [target]
//! host = "cluster.example.edu"        # omit for a local target
//! user = "deploy"
//! production_user = "wfprod"
//! workflows_root = "/ccms/workflows"
//! tools_root = "/data/cluster/tools"
//!
//! [repo]
//! root = "."
//! exclude = "deployment"              # the directory holding this tooling
//!
//! [fleet]
//! workflows = ["demo", "librarysearch"]
//!
//! [portal]
//! base_url = "https://portal.example.edu/ProteoSAFe"
//! username = "regression-bot"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::WfdError;

/// File name of the configuration file searched for in parent directories.
pub const CONFIG_FILE: &str = "wfdeploy.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Deployment target description.
    pub target: TargetConfig,
    /// Workflow repository layout.
    #[serde(default)]
    pub repo: RepoConfig,
    /// Workflows deployed by `deploy-all`.
    #[serde(default)]
    pub fleet: FleetConfig,
    /// Optional portal endpoint for task watching and regression checks.
    #[serde(default)]
    pub portal: Option<PortalConfig>,
    /// Directory holding the loaded configuration file; relative repo paths
    /// resolve against it, not against the invocation cwd.
    #[serde(skip)]
    base_dir: PathBuf,
}

/// Where and how deployments land.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Remote host name. When absent, commands and uploads run locally.
    #[serde(default)]
    pub host: Option<String>,
    /// SSH user for the remote host.
    #[serde(default)]
    pub user: Option<String>,
    /// Identity that owns production paths; privileged operations run as this
    /// user via sudo.
    pub production_user: String,
    /// Root directory for workflow component documents on the target.
    pub workflows_root: String,
    /// Root directory for tool bundles on the target.
    pub tools_root: String,
}

/// Layout of the local workflow repository.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepoConfig {
    /// Root directory scanned for sibling workflow/tool directories.
    #[serde(default = "default_repo_root")]
    pub root: PathBuf,
    /// Directory name excluded from registry scans (the deployment tooling's
    /// own directory).
    #[serde(default = "default_exclude")]
    pub exclude: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self { root: default_repo_root(), exclude: default_exclude() }
    }
}

fn default_repo_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_exclude() -> String {
    "deployment".to_string()
}

/// The set of workflows covered by `deploy-all` and `manifest`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FleetConfig {
    /// Workflow directory names, relative to the repository root.
    #[serde(default)]
    pub workflows: Vec<String>,
}

/// Portal endpoint used for task submission, status polling and regression
/// checks after a deploy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PortalConfig {
    /// Base URL up to and including the application path, no trailing slash.
    pub base_url: String,
    /// Login user for task submission. Status polling is unauthenticated.
    #[serde(default)]
    pub username: Option<String>,
    /// Login password. Prefer supplying this via the `WFDEPLOY_PORTAL_PASSWORD`
    /// environment variable over committing it here.
    #[serde(default)]
    pub password: Option<String>,
}

impl Config {
    /// Loads the configuration by searching for `wfdeploy.toml` from `start`
    /// upward to the filesystem root.
    pub fn load_from(start: &Path) -> Result<Self> {
        let path = find_config_file(start).ok_or(WfdError::ConfigNotFound)?;
        Self::load_path(&path)
    }

    /// Loads the configuration from the current directory upward.
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        Self::load_from(&cwd)
    }

    /// Loads and parses a specific configuration file.
    pub fn load_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config: Self = toml::from_str(&content).map_err(|e| WfdError::ConfigParseError {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.base_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field consistency that serde cannot express.
    fn validate(&self) -> Result<()> {
        if self.target.host.is_some() && self.target.user.is_none() {
            return Err(WfdError::ConfigParseError {
                file: CONFIG_FILE.to_string(),
                reason: "target.user is required when target.host is set".to_string(),
            }
            .into());
        }
        if self.target.workflows_root.is_empty() || self.target.tools_root.is_empty() {
            return Err(WfdError::ConfigParseError {
                file: CONFIG_FILE.to_string(),
                reason: "target.workflows_root and target.tools_root must be non-empty".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// The repository root, resolved against the directory holding the
    /// configuration when relative. An absolute `repo.root` is returned
    /// unchanged (`join` on an absolute path replaces the base).
    pub fn repo_root(&self) -> PathBuf {
        self.base_dir.join(&self.repo.root)
    }
}

/// Walks from `start` to the filesystem root looking for [`CONFIG_FILE`].
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(d) = dir {
        let candidate = d.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = d.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn minimal_toml() -> &'static str {
        r#"
[target]
production_user = "wfprod"
workflows_root = "/ccms/workflows"
tools_root = "/data/cluster/tools"
"#
    }

    #[test]
    fn loads_minimal_config_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, minimal_toml()).unwrap();

        let config = Config::load_path(&path).unwrap();
        assert!(config.target.host.is_none());
        assert_eq!(config.repo.exclude, "deployment");
        assert!(config.fleet.workflows.is_empty());
        assert!(config.portal.is_none());
    }

    #[test]
    fn finds_config_in_parent_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), minimal_toml()).unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, dir.path().join(CONFIG_FILE));
    }

    #[test]
    fn remote_host_without_user_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
[target]
host = "cluster.example.edu"
production_user = "wfprod"
workflows_root = "/ccms/workflows"
tools_root = "/data/cluster/tools"
"#,
        )
        .unwrap();

        let err = Config::load_path(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[test]
    fn relative_repo_root_resolves_against_the_config_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, format!("{}\n[repo]\nroot = \"workflows\"\n", minimal_toml())).unwrap();

        let config = Config::load_path(&path).unwrap();
        assert_eq!(config.repo_root(), dir.path().join("workflows"));
    }

    #[test]
    fn absolute_repo_root_is_kept_as_is() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, format!("{}\n[repo]\nroot = \"/srv/workflows\"\n", minimal_toml()))
            .unwrap();

        let config = Config::load_path(&path).unwrap();
        assert_eq!(config.repo_root(), PathBuf::from("/srv/workflows"));
    }

    #[test]
    fn missing_config_reports_typed_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::load_from(dir.path()).unwrap_err();
        assert!(err.downcast_ref::<WfdError>().is_some());
    }
}
