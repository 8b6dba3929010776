//! Common fixtures for wfdeploy integration tests.

// Shared across test binaries; not every helper is used in every file.
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wfdeploy::test_utils::write_local_config;

pub use wfdeploy::test_utils::WorkflowFixture;

/// A temporary workflow repository with a local deployment target.
pub struct TestRepo {
    dir: TempDir,
    pub workflows_root: PathBuf,
    pub tools_root: PathBuf,
}

impl TestRepo {
    /// Creates a repository whose `wfdeploy.toml` fleet lists `workflows`.
    pub fn new(workflows: &[&str]) -> Self {
        let dir = TempDir::new().expect("create temp repo");
        let (workflows_root, tools_root) = write_local_config(dir.path(), workflows);
        Self { dir, workflows_root, tools_root }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("wfdeploy.toml")
    }

    /// A `wfdeploy` invocation rooted in this repository.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("wfdeploy").expect("binary built");
        cmd.current_dir(self.dir.path());
        cmd.arg("--config").arg(self.config_path());
        cmd
    }
}
