//! Report or rewrite dependency drift for one workflow.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use crate::channel::Channel;
use crate::config::Config;
use crate::constants::UNVERSIONED;
use crate::deploy::Deployer;
use crate::deps::{NoProbe, ReconciliationReport, ResolveOptions, SeenSet, Status, resolve};
use crate::registry::Registry;

/// Arguments for `wfdeploy deps`.
#[derive(Args)]
pub struct DepsCommand {
    /// Workflow directory whose dependencies to reconcile
    pub workflow_dir: PathBuf,

    /// Rewrite tool.xml to pin drifted dependencies to their local versions
    #[arg(long)]
    pub write: bool,

    /// Walk transitively into tracked dependencies' own declarations
    #[arg(long)]
    pub recursive: bool,

    /// Also query the target for whether each local version is deployed
    #[arg(long)]
    pub check_remote: bool,
}

impl DepsCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        let registry = Registry::scan(&config.repo_root(), &config.repo.exclude)?;
        let opts = ResolveOptions { rewrite: self.write, recurse: self.recursive };

        let mut seen = SeenSet::new();
        let reports = if self.check_remote {
            let channel = Channel::from_target(&config.target);
            let deployer = Deployer::new(&channel, &config.target);
            resolve(&self.workflow_dir, &registry, &mut seen, opts, Some(&deployer)).await?
        } else {
            resolve::<NoProbe>(&self.workflow_dir, &registry, &mut seen, opts, None).await?
        };

        for report in &reports {
            print_report(report, self.check_remote);
        }

        let drifted: usize = reports.iter().map(|r| r.drifted().count()).sum();
        let total: usize = reports.iter().map(|r| r.entries.len()).sum();
        println!("\n{total} dependency pin(s) examined, {drifted} drifted");
        Ok(())
    }
}

fn print_report(report: &ReconciliationReport, show_remote: bool) {
    if report.entries.is_empty() {
        return;
    }
    println!("\n{}", report.workflow_dir.display().to_string().bold());
    for entry in &report.entries {
        let status = match entry.status {
            Status::Match => "MATCH".green(),
            Status::Drift => "DRIFT".yellow(),
            Status::Untracked => "UNTRACKED".red(),
        };
        let declared = display_version(&entry.declared_version);
        let mut line = match (&entry.local_version, entry.status) {
            (Some(local), Status::Drift) => {
                format!("  {status:<10} {} {declared} -> {local}", entry.dependency)
            }
            _ => format!("  {status:<10} {} {declared}", entry.dependency),
        };
        if show_remote {
            match entry.remotely_deployed {
                Some(true) => line.push_str("  [on target]"),
                Some(false) => line.push_str("  [not on target]"),
                None => {}
            }
        }
        println!("{line}");
    }
    if report.rewritten {
        println!("  {}", "tool.xml rewritten".cyan());
    }
}

fn display_version(version: &str) -> &str {
    if version == UNVERSIONED { "(unversioned)" } else { version }
}
