//! Deployment engine: publishing rendered workflow components and tool
//! bundles onto the target.
//!
//! # Layout on the target
//!
//! - Workflow components: `<workflows-root>/<name>/versions/<version>/<component>`
//!   always, plus the default pointer `<workflows-root>/<name>/<component>`
//!   (a sibling of `versions/`; see DESIGN.md) which is refreshed on every
//!   deploy unless explicitly disabled.
//! - Tool bundles: `<tools-root>/<name>/<version>/...`, a full mirror of the
//!   source tree. No default pointer.
//!
//! Directories are created with `mkdir -p` semantics before population, so
//! repeated deploys of the same version are idempotent at the layout level.
//! Promotion is forward-only; there is no rollback.
//!
//! # Production mode
//!
//! Privileged paths are owned by the production user. Nothing is ever
//! uploaded directly into them: files land in a neutral `/tmp` location
//! (uuid-suffixed) and are copied into place as the production user, so the
//! transfer channel itself needs no elevated credentials. In non-production
//! mode the engine instead loosens permissions on the deployed tree
//! afterwards, a convenience for shared development hosts.
//!
//! Every temporary artifact (local archive, remote archive, remote
//! extraction directory) is removed on success and failure paths alike.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::channel::Channel;
use crate::config::TargetConfig;
use crate::constants::WORKFLOW_COMPONENTS;
use crate::core::WfdError;
use crate::deps::resolver::DeployedProbe;
use crate::makeparams::WorkflowParams;
use crate::templating::{RenderContext, render_component, validate_staged};

/// Options for one workflow deployment.
#[derive(Debug, Clone, Copy)]
pub struct DeployOptions {
    /// Deploy into privileged production paths via the production user.
    pub production: bool,
    /// Refresh the default (unqualified) component paths. On by default;
    /// disabling leaves the previously promoted version active.
    pub update_default: bool,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self { production: false, update_default: true }
    }
}

/// Publishes workflows and tool bundles through an execution channel.
pub struct Deployer<'a> {
    channel: &'a Channel,
    target: &'a TargetConfig,
}

impl<'a> Deployer<'a> {
    /// Creates a deployer over the given channel and target description.
    pub const fn new(channel: &'a Channel, target: &'a TargetConfig) -> Self {
        Self { channel, target }
    }

    /// Renders and uploads every component present in `workflow_dir`.
    pub async fn deploy_workflow(
        &self,
        workflow_dir: &Path,
        params: &WorkflowParams,
        version: &str,
        opts: DeployOptions,
    ) -> Result<()> {
        let staging = tempfile::tempdir().context("Failed to create local staging directory")?;
        let ctx = RenderContext {
            name: &params.name,
            version,
            tool_name: Some(&params.tool_name),
            label: params.label.as_deref(),
            description: params.description.as_deref(),
        };

        let mut staged: Vec<&str> = Vec::new();
        for component in WORKFLOW_COMPONENTS {
            let source = workflow_dir.join(component);
            if source.is_file() {
                render_component(component, &source, &staging.path().join(component), &ctx)?;
                staged.push(component);
            }
        }
        if staged.is_empty() {
            warn!("{}: no workflow components to deploy", workflow_dir.display());
            return Ok(());
        }

        // Best-effort structural checks; findings warn but never block.
        validate_staged(staging.path());

        let base_dir = format!("{}/{}", self.target.workflows_root, params.name);
        let versioned_dir = format!("{base_dir}/versions/{version}");
        self.ensure_dir(&versioned_dir, opts.production).await?;

        for component in &staged {
            let local = staging.path().join(component);
            self.put_file(&local, &format!("{versioned_dir}/{component}"), opts.production)
                .await?;
            if opts.update_default {
                self.put_file(&local, &format!("{base_dir}/{component}"), opts.production)
                    .await?;
            }
        }

        if !opts.production {
            self.loosen_permissions(&base_dir).await?;
        }

        info!(
            "deployed workflow {} version {} ({} component(s))",
            params.name,
            version,
            staged.len()
        );
        Ok(())
    }

    /// Mirrors `source_dir` into `<tools-root>/<name>/<version>/` via
    /// archive, transfer, extract and sync.
    pub async fn deploy_tool_bundle(
        &self,
        name: &str,
        version: &str,
        source_dir: &Path,
        production: bool,
    ) -> Result<()> {
        let final_dir = format!("{}/{}/{}", self.target.tools_root, name, version);
        self.ensure_dir(&final_dir, production).await?;

        // Distinct tags for the local and remote archives: on a local channel
        // the remote paths live on this same host, and a shared name would
        // make the upload copy the archive onto itself.
        let local_tag = format!("{}_{}", mangle(source_dir), Uuid::new_v4());
        let remote_tag = format!("{}_{}", mangle(source_dir), Uuid::new_v4());
        let local_tar = std::env::temp_dir().join(format!("{local_tag}.tar"));
        let remote_tar = format!("/tmp/{remote_tag}.tar");
        let remote_extract = format!("/tmp/{remote_tag}");

        let result = self
            .transfer_bundle(source_dir, &local_tar, &remote_tar, &remote_extract, &final_dir, production)
            .await;

        // Cleanup runs on both success and failure paths.
        if let Err(e) = tokio::fs::remove_file(&local_tar).await {
            debug!("local archive {} already gone: {e}", local_tar.display());
        }
        if let Err(e) =
            self.channel.run(&format!("rm -rf {remote_tar} {remote_extract}")).await
        {
            warn!("failed to clean remote temporaries for {name}/{version}: {e:#}");
        }

        result?;

        if !production {
            self.loosen_permissions(&final_dir).await?;
        }
        info!("deployed tool bundle {name}/{version} from {}", source_dir.display());
        Ok(())
    }

    async fn transfer_bundle(
        &self,
        source_dir: &Path,
        local_tar: &Path,
        remote_tar: &str,
        remote_extract: &str,
        final_dir: &str,
        production: bool,
    ) -> Result<()> {
        // The archive step always runs on this host, whatever the channel.
        let tar_output = Command::new("tar")
            .arg("-C")
            .arg(source_dir)
            .arg("-chf")
            .arg(local_tar)
            .arg(".")
            .output()
            .await
            .context("Failed to spawn tar")?;
        if !tar_output.status.success() {
            return Err(WfdError::RemoteCommandFailed {
                command: format!("tar -C {} -chf {} .", source_dir.display(), local_tar.display()),
                stderr: String::from_utf8_lossy(&tar_output.stderr).into_owned(),
            }
            .into());
        }

        self.channel.upload(local_tar, remote_tar, true).await?;
        self.channel.run(&format!("mkdir -p {remote_extract}")).await?;
        self.channel.run(&format!("tar -C {remote_extract} -xf {remote_tar}")).await?;

        let sync = format!("rsync -rlptD {remote_extract}/ {final_dir}/");
        if production {
            self.channel.run_privileged(&sync, &self.target.production_user).await?;
        } else {
            self.channel.run(&sync).await?;
        }
        Ok(())
    }

    /// Creates a directory tree on the target, privileged when required.
    async fn ensure_dir(&self, path: &str, production: bool) -> Result<()> {
        let cmd = format!("mkdir -p {path}");
        if production {
            self.channel.run_privileged(&cmd, &self.target.production_user).await?;
        } else {
            self.channel.run(&cmd).await?;
        }
        Ok(())
    }

    /// Places one file at `remote`, honoring the privileged-copy pattern.
    async fn put_file(&self, local: &Path, remote: &str, production: bool) -> Result<()> {
        if !production {
            return self.channel.upload(local, remote, true).await;
        }

        let neutral = format!("/tmp/{}_{}", mangle(local), Uuid::new_v4());
        self.channel.upload(local, &neutral, true).await?;
        let copied = self
            .channel
            .run_privileged(&format!("cp {neutral} {remote}"), &self.target.production_user)
            .await;
        if let Err(e) = self.channel.run(&format!("rm -f {neutral}")).await {
            debug!("failed to remove neutral upload {neutral}: {e:#}");
        }
        copied.map(|_| ())
    }

    /// World-writable trees are a deliberate convenience on non-production
    /// hosts; never applied in production mode.
    async fn loosen_permissions(&self, path: &str) -> Result<()> {
        self.channel.run(&format!("chmod -R 777 {path}")).await.map(|_| ())
    }

    /// Whether `<tools-root>/<name>/<version>` already exists on the target.
    pub async fn tool_version_exists(&self, name: &str, version: &str) -> Result<bool> {
        let path = format!("{}/{}/{}", self.target.tools_root, name, version);
        match self.channel.run(&format!("test -d {path}")).await {
            Ok(_) => Ok(true),
            Err(e) => match e.downcast_ref::<WfdError>() {
                // Exit 1 from test means "absent"; anything else propagates.
                Some(WfdError::RemoteCommandFailed { stderr, .. }) if stderr.is_empty() => {
                    Ok(false)
                }
                _ => Err(e),
            },
        }
    }
}

impl DeployedProbe for Deployer<'_> {
    async fn is_deployed(&self, name: &str, version: &str) -> Result<bool> {
        self.tool_version_exists(name, version).await
    }
}

/// Flattens a path into a /tmp-safe file name fragment.
fn mangle(path: &Path) -> String {
    path.display().to_string().replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn target(root: &Path) -> TargetConfig {
        TargetConfig {
            host: None,
            user: None,
            production_user: "wfprod".to_string(),
            workflows_root: root.join("workflows").display().to_string(),
            tools_root: root.join("tools").display().to_string(),
        }
    }

    fn make_workflow_dir(root: &Path) -> PathBuf {
        let dir = root.join("demo");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("input.xml"), r#"<interface id="old" version="0"/>"#).unwrap();
        fs::write(
            dir.join("tool.xml"),
            r#"<toolset><pathSet base="$base/bin"/></toolset>"#,
        )
        .unwrap();
        dir
    }

    fn params() -> WorkflowParams {
        WorkflowParams {
            name: "demo".to_string(),
            tool_name: "demo_bin".to_string(),
            version: "1.0".to_string(),
            label: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn non_production_deploy_creates_versioned_and_default_paths() {
        let root = TempDir::new().unwrap();
        let workflow_dir = make_workflow_dir(root.path());
        let target = target(root.path());
        let channel = Channel::from_target(&target);
        let deployer = Deployer::new(&channel, &target);

        deployer
            .deploy_workflow(&workflow_dir, &params(), "1.0", DeployOptions::default())
            .await
            .unwrap();

        let base = root.path().join("workflows/demo");
        for file in ["versions/1.0/input.xml", "versions/1.0/tool.xml", "input.xml", "tool.xml"] {
            assert!(base.join(file).is_file(), "missing {file}");
        }

        // Stamped identity in the versioned input document.
        let doc = crate::xmldoc::Document::parse(&base.join("versions/1.0/input.xml")).unwrap();
        assert_eq!(doc.root.attributes.get("id").unwrap(), "demo");
        assert_eq!(doc.root.attributes.get("version").unwrap(), "1.0");

        // Resolved tool base path.
        let doc = crate::xmldoc::Document::parse(&base.join("tool.xml")).unwrap();
        assert_eq!(doc.path_set_bases().next().unwrap(), "demo_bin/1.0/bin");
    }

    #[tokio::test]
    async fn skipping_default_update_leaves_pointer_untouched() {
        let root = TempDir::new().unwrap();
        let workflow_dir = make_workflow_dir(root.path());
        let target = target(root.path());
        let channel = Channel::from_target(&target);
        let deployer = Deployer::new(&channel, &target);

        let opts = DeployOptions { production: false, update_default: false };
        deployer.deploy_workflow(&workflow_dir, &params(), "2.0", opts).await.unwrap();

        let base = root.path().join("workflows/demo");
        assert!(base.join("versions/2.0/input.xml").is_file());
        assert!(!base.join("input.xml").exists());
    }

    #[tokio::test]
    async fn tool_bundle_is_mirrored_and_temporaries_removed() {
        let root = TempDir::new().unwrap();
        let source = root.path().join("demo/tools/demo_bin");
        fs::create_dir_all(source.join("scripts")).unwrap();
        fs::write(source.join("run.sh"), "#!/bin/sh\n").unwrap();
        fs::write(source.join("scripts/helper.py"), "print()\n").unwrap();

        let target = target(root.path());
        let channel = Channel::from_target(&target);
        let deployer = Deployer::new(&channel, &target);

        deployer.deploy_tool_bundle("demo_bin", "1.0", &source, false).await.unwrap();

        let final_dir = root.path().join("tools/demo_bin/1.0");
        assert!(final_dir.join("run.sh").is_file());
        assert!(final_dir.join("scripts/helper.py").is_file());

        // No archive or extraction directory left behind for this bundle.
        let leftovers: Vec<_> = fs::read_dir(std::env::temp_dir())
            .unwrap()
            .filter_map(std::result::Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.contains("demo_bin") && n.contains(&mangle(&source)))
            .collect();
        assert!(leftovers.is_empty(), "temporaries left behind: {leftovers:?}");
    }

    #[tokio::test]
    async fn tool_version_probe_distinguishes_present_and_absent() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("tools/demo_bin/1.0")).unwrap();
        let target = target(root.path());
        let channel = Channel::from_target(&target);
        let deployer = Deployer::new(&channel, &target);

        assert!(deployer.tool_version_exists("demo_bin", "1.0").await.unwrap());
        assert!(!deployer.tool_version_exists("demo_bin", "9.9").await.unwrap());
    }

    #[tokio::test]
    async fn directory_without_components_deploys_nothing() {
        let root = TempDir::new().unwrap();
        let empty = root.path().join("empty");
        fs::create_dir_all(&empty).unwrap();
        let target = target(root.path());
        let channel = Channel::from_target(&target);
        let deployer = Deployer::new(&channel, &target);

        deployer
            .deploy_workflow(&empty, &params(), "1.0", DeployOptions::default())
            .await
            .unwrap();
        assert!(!root.path().join("workflows/demo").exists());
    }
}
