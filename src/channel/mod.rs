//! Execution channel: running commands and placing files on the deployment
//! target.
//!
//! Two transports exist behind one interface: [`LocalChannel`] executes
//! through `sh -c` on this host (used by targetless configurations and the
//! test suite), and [`SshChannel`] drives `ssh`/`scp` subprocesses against a
//! remote head node. Privileged execution goes through `sudo -u <user>` on
//! the executing side; file uploads never use elevated credentials. The
//! privileged-copy pattern in the deployment engine moves files into
//! protected paths after a neutral upload.
//!
//! Every command is attempted exactly once. Non-zero exit or a spawn failure
//! becomes [`WfdError::RemoteCommandFailed`] / [`WfdError::UploadFailed`];
//! retries and timeouts are deliberately absent (a hung remote command blocks
//! the deployment, which operators prefer over silently duplicated work).

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::config::TargetConfig;
use crate::core::WfdError;

/// Captured result of a completed command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Process exit code; 0 on the success path.
    pub exit_code: i32,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

/// A command/upload transport to the deployment target.
#[derive(Debug, Clone)]
pub enum Channel {
    /// Commands run on this host.
    Local(LocalChannel),
    /// Commands run on a remote host over ssh.
    Ssh(SshChannel),
}

impl Channel {
    /// Builds the channel matching the configured target: ssh when a host is
    /// set, local otherwise.
    pub fn from_target(target: &TargetConfig) -> Self {
        match (&target.host, &target.user) {
            (Some(host), Some(user)) => {
                Self::Ssh(SshChannel { user: user.clone(), host: host.clone() })
            }
            _ => Self::Local(LocalChannel),
        }
    }

    /// Runs a shell command on the target, failing on non-zero exit.
    pub async fn run(&self, cmd: &str) -> Result<CommandOutput> {
        match self {
            Self::Local(c) => c.run(cmd).await,
            Self::Ssh(c) => c.run(cmd).await,
        }
    }

    /// Runs a shell command on the target as `as_user` via sudo.
    pub async fn run_privileged(&self, cmd: &str, as_user: &str) -> Result<CommandOutput> {
        match self {
            Self::Local(c) => c.run_privileged(cmd, as_user).await,
            Self::Ssh(c) => c.run_privileged(cmd, as_user).await,
        }
    }

    /// Places a local file at `remote` on the target.
    pub async fn upload(&self, local: &Path, remote: &str, preserve: bool) -> Result<()> {
        match self {
            Self::Local(c) => c.upload(local, remote, preserve).await,
            Self::Ssh(c) => c.upload(local, remote, preserve).await,
        }
    }
}

/// Runs everything on the current host through `sh -c`.
#[derive(Debug, Clone, Copy)]
pub struct LocalChannel;

impl LocalChannel {
    async fn run(&self, cmd: &str) -> Result<CommandOutput> {
        debug!(target: "channel", "local: sh -c {cmd}");
        execute(Command::new("sh").args(["-c", cmd]), cmd).await
    }

    async fn run_privileged(&self, cmd: &str, as_user: &str) -> Result<CommandOutput> {
        debug!(target: "channel", "local: sudo -u {as_user} sh -c {cmd}");
        execute(Command::new("sudo").args(["-u", as_user, "sh", "-c", cmd]), cmd).await
    }

    async fn upload(&self, local: &Path, remote: &str, _preserve: bool) -> Result<()> {
        debug!(target: "channel", "local copy: {} -> {remote}", local.display());
        // std copy carries permission bits on unix, which covers preserve.
        tokio::fs::copy(local, remote).await.map_err(|e| WfdError::UploadFailed {
            local: local.display().to_string(),
            remote: remote.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

/// Runs commands over `ssh` and uploads over `scp`.
#[derive(Debug, Clone)]
pub struct SshChannel {
    /// Login user on the remote host.
    pub user: String,
    /// Remote host name.
    pub host: String,
}

impl SshChannel {
    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    async fn run(&self, cmd: &str) -> Result<CommandOutput> {
        debug!(target: "channel", "ssh {}: {cmd}", self.destination());
        execute(
            Command::new("ssh").arg("-o").arg("BatchMode=yes").arg(self.destination()).arg(cmd),
            cmd,
        )
        .await
    }

    async fn run_privileged(&self, cmd: &str, as_user: &str) -> Result<CommandOutput> {
        let wrapped = format!("sudo -u {} sh -c {}", as_user, sh_quote(cmd));
        debug!(target: "channel", "ssh {}: {wrapped}", self.destination());
        execute(
            Command::new("ssh")
                .arg("-o")
                .arg("BatchMode=yes")
                .arg("-t")
                .arg(self.destination())
                .arg(&wrapped),
            cmd,
        )
        .await
    }

    async fn upload(&self, local: &Path, remote: &str, preserve: bool) -> Result<()> {
        let dest = format!("{}:{}", self.destination(), remote);
        debug!(target: "channel", "scp: {} -> {dest}", local.display());
        let mut cmd = Command::new("scp");
        cmd.arg("-o").arg("BatchMode=yes");
        if preserve {
            cmd.arg("-p");
        }
        cmd.arg("-q").arg(local).arg(&dest);
        execute(&mut cmd, "scp").await.map_err(|e| WfdError::UploadFailed {
            local: local.display().to_string(),
            remote: remote.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

/// Single-quotes a string for safe embedding in a remote shell command line.
fn sh_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Spawns the prepared command, captures output, and converts non-zero exit
/// into a typed error.
async fn execute(cmd: &mut Command, described: &str) -> Result<CommandOutput> {
    let output = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("Failed to spawn command for: {described}"))?;

    let result = CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !output.status.success() {
        return Err(WfdError::RemoteCommandFailed {
            command: described.to_string(),
            stderr: result.stderr,
        }
        .into());
    }
    Ok(result)
}
