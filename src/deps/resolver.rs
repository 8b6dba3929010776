//! Dependency resolution: diffing declared versions against the local
//! repository and staging declaration rewrites.
//!
//! Resolution for one workflow is flat by default: only the workflow's direct
//! dependencies are classified, matching the printed report most callers
//! want. Transitive walking is available through
//! [`ResolveOptions::recurse`], which feeds the caller's [`SeenSet`] forward
//! into every nested call, which is exactly what makes cycles and diamond
//! dependencies safe: a `(name, declared_version)` pair already recorded in
//! `seen` is never reprocessed, and recursion only descends into
//! dependencies that were newly processed by the current call.
//!
//! The `seen` set is owned by the top-level caller and must be constructed
//! fresh per resolution run; it is never ambient state.
//!
//! # A deliberate imprecision
//!
//! When two consumers pin the same dependency at different versions, the
//! later sighting overwrites the earlier `seen` record, so the report
//! reflects only the most recently visited requirement. The original tooling
//! behaved the same way and consumers rely on the report being cheap; see
//! DESIGN.md before "fixing" this.

use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::constants::DEPENDENCY_DOCUMENT;
use crate::deps::extract::extract;
use crate::deps::rewrite::{PinUpdate, rewrite};
use crate::registry::Registry;

/// Dependency name -> declared version already examined this run.
pub type SeenSet = HashMap<String, String>;

/// Classification of one dependency against the local registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Declared version equals the locally available version.
    Match,
    /// Declared version differs from the locally available version.
    Drift,
    /// The dependency is not present in the local registry at all.
    Untracked,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Match => write!(f, "MATCH"),
            Self::Drift => write!(f, "DRIFT"),
            Self::Untracked => write!(f, "UNTRACKED"),
        }
    }
}

/// One reconciled dependency.
#[derive(Debug, Clone)]
pub struct ReconciliationEntry {
    /// Dependency name.
    pub dependency: String,
    /// Version the workflow's document declares.
    pub declared_version: String,
    /// Locally available version, when the dependency is tracked.
    pub local_version: Option<String>,
    /// Classification outcome.
    pub status: Status,
    /// Whether `(dependency, local_version)` already exists on the target.
    /// `None` when no probe was supplied or the dependency is untracked.
    pub remotely_deployed: Option<bool>,
}

/// The reconciliation outcome for one workflow.
#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    /// The workflow directory that was resolved.
    pub workflow_dir: PathBuf,
    /// Per-dependency entries, in extraction order.
    pub entries: Vec<ReconciliationEntry>,
    /// Whether the declaration document was rewritten.
    pub rewritten: bool,
}

impl ReconciliationReport {
    /// Entries classified as drift.
    pub fn drifted(&self) -> impl Iterator<Item = &ReconciliationEntry> {
        self.entries.iter().filter(|e| e.status == Status::Drift)
    }
}

/// Knobs for one resolution run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Patch tool.xml to pin drifted dependencies to their local versions.
    pub rewrite: bool,
    /// Walk into tracked dependencies' own dependency documents.
    pub recurse: bool,
}

/// Best-effort query for whether a tool version already exists on the
/// deployment target. Failures must be treated as "not deployed".
pub trait DeployedProbe {
    /// Returns whether `<tools-root>/<name>/<version>` exists on the target.
    fn is_deployed(
        &self,
        name: &str,
        version: &str,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// Probe that answers "not deployed" for everything; stands in when no
/// target is reachable or wanted.
pub struct NoProbe;

impl DeployedProbe for NoProbe {
    async fn is_deployed(&self, _name: &str, _version: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Resolves `workflow_dir`'s dependencies against `registry`.
///
/// Returns one report per visited workflow: the first element is always the
/// workflow itself, followed by any transitively visited dependencies when
/// [`ResolveOptions::recurse`] is set. A missing dependency document is fatal
/// to this workflow only; batch callers isolate per-workflow failures.
pub async fn resolve<P: DeployedProbe + Sync>(
    workflow_dir: &Path,
    registry: &Registry,
    seen: &mut SeenSet,
    opts: ResolveOptions,
    probe: Option<&P>,
) -> Result<Vec<ReconciliationReport>> {
    let refs = extract(workflow_dir)?;
    debug!("{}: {} declared dependencies", workflow_dir.display(), refs.len());

    let mut entries = Vec::new();
    let mut updates: Vec<PinUpdate> = Vec::new();
    let mut to_recurse: Vec<PathBuf> = Vec::new();

    for dep in refs {
        // Re-checking the identical pin would only repeat remote queries.
        if seen.get(&dep.name) == Some(&dep.declared_version) {
            debug!("{}@{} already examined, skipping", dep.name, dep.declared_version);
            continue;
        }

        let entry = match registry.get(&dep.name) {
            None => ReconciliationEntry {
                dependency: dep.name.clone(),
                declared_version: dep.declared_version.clone(),
                local_version: None,
                status: Status::Untracked,
                remotely_deployed: None,
            },
            Some(record) => {
                let status = if record.version == dep.declared_version {
                    Status::Match
                } else {
                    updates.push(PinUpdate {
                        name: dep.name.clone(),
                        from: dep.declared_version.clone(),
                        to: record.version.clone(),
                    });
                    Status::Drift
                };

                let remotely_deployed = match probe {
                    None => None,
                    Some(p) => match p.is_deployed(&dep.name, &record.version).await {
                        Ok(deployed) => Some(deployed),
                        Err(e) => {
                            // A failed probe never blocks reconciliation.
                            warn!("deploy probe for {}@{} failed: {e:#}", dep.name, record.version);
                            Some(false)
                        }
                    },
                };

                to_recurse.push(record.location.clone());
                ReconciliationEntry {
                    dependency: dep.name.clone(),
                    declared_version: dep.declared_version.clone(),
                    local_version: Some(record.version.clone()),
                    status,
                    remotely_deployed,
                }
            }
        };

        // Recorded regardless of classification: this is the cycle and
        // diamond guard. A later sighting at a different version overwrites.
        seen.insert(dep.name, dep.declared_version);
        entries.push(entry);
    }

    let rewritten = if opts.rewrite && !updates.is_empty() {
        rewrite(workflow_dir, &updates)?
    } else {
        false
    };

    let mut reports =
        vec![ReconciliationReport { workflow_dir: workflow_dir.to_path_buf(), entries, rewritten }];

    if opts.recurse {
        for location in to_recurse {
            // Leaf tools often carry no dependency document at all.
            if !location.join(DEPENDENCY_DOCUMENT).is_file() {
                debug!("{}: no dependency document, not descending", location.display());
                continue;
            }
            // Only dependencies processed by *this* call are descended into,
            // so a cycle terminates once every pin has been seen.
            let nested = Box::pin(resolve(&location, registry, seen, opts, probe)).await?;
            reports.extend(nested);
        }
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn make_workflow(root: &Path, dir: &str, tool: &str, version: &str, path_sets: &[&str]) {
        let path = root.join(dir);
        fs::create_dir_all(&path).unwrap();
        fs::write(
            path.join("Makefile"),
            format!("WORKFLOW_NAME={dir}\nTOOL_FOLDER_NAME={tool}\nWORKFLOW_VERSION={version}\n"),
        )
        .unwrap();
        let body: String =
            path_sets.iter().map(|b| format!(r#"<pathSet base="{b}"/>"#)).collect();
        fs::write(path.join("tool.xml"), format!("<toolset>{body}</toolset>")).unwrap();
    }

    fn scan(root: &Path) -> Registry {
        Registry::scan(root, "deployment").unwrap()
    }

    #[tokio::test]
    async fn drift_and_untracked_are_classified() {
        let root = TempDir::new().unwrap();
        make_workflow(root.path(), "x", "x", "2.0", &[]);
        make_workflow(root.path(), "wf", "wf_bin", "1.0", &["x/1.0", "ghost/3.1"]);
        let registry = scan(root.path());

        let mut seen = SeenSet::new();
        let reports = resolve::<NoProbe>(
            &root.path().join("wf"),
            &registry,
            &mut seen,
            ResolveOptions::default(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(reports.len(), 1);
        let entries = &reports[0].entries;
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].dependency, "x");
        assert_eq!(entries[0].status, Status::Drift);
        assert_eq!(entries[0].declared_version, "1.0");
        assert_eq!(entries[0].local_version.as_deref(), Some("2.0"));

        assert_eq!(entries[1].dependency, "ghost");
        assert_eq!(entries[1].status, Status::Untracked);
        assert!(entries[1].local_version.is_none());
    }

    #[tokio::test]
    async fn matching_pin_reports_match_and_no_rewrite() {
        let root = TempDir::new().unwrap();
        make_workflow(root.path(), "x", "x", "1.0", &[]);
        make_workflow(root.path(), "wf", "wf_bin", "1.0", &["x/1.0"]);
        let registry = scan(root.path());

        let mut seen = SeenSet::new();
        let reports = resolve::<NoProbe>(
            &root.path().join("wf"),
            &registry,
            &mut seen,
            ResolveOptions { rewrite: true, recurse: false },
            None,
        )
        .await
        .unwrap();

        assert_eq!(reports[0].entries[0].status, Status::Match);
        assert!(!reports[0].rewritten);
    }

    #[tokio::test]
    async fn identical_pin_in_seen_set_is_skipped() {
        let root = TempDir::new().unwrap();
        make_workflow(root.path(), "x", "x", "2.0", &[]);
        make_workflow(root.path(), "wf", "wf_bin", "1.0", &["x/1.0", "x/1.0"]);
        let registry = scan(root.path());

        let mut seen = SeenSet::new();
        let reports = resolve::<NoProbe>(
            &root.path().join("wf"),
            &registry,
            &mut seen,
            ResolveOptions::default(),
            None,
        )
        .await
        .unwrap();

        // The duplicate sighting of the same exact pin is not double-counted.
        assert_eq!(reports[0].entries.len(), 1);
    }

    #[tokio::test]
    async fn later_sighting_at_different_version_overwrites_seen() {
        let root = TempDir::new().unwrap();
        make_workflow(root.path(), "x", "x", "2.0", &[]);
        make_workflow(root.path(), "wf", "wf_bin", "1.0", &["x/1.0", "x/1.5"]);
        let registry = scan(root.path());

        let mut seen = SeenSet::new();
        let reports = resolve::<NoProbe>(
            &root.path().join("wf"),
            &registry,
            &mut seen,
            ResolveOptions::default(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(reports[0].entries.len(), 2);
        assert_eq!(seen.get("x").map(String::as_str), Some("1.5"));
    }

    #[tokio::test]
    async fn recursion_walks_tracked_dependencies_and_survives_cycles() {
        let root = TempDir::new().unwrap();
        // a depends on b, b depends on a: a classic cycle.
        make_workflow(root.path(), "a", "a", "1.0", &["b/1.0"]);
        make_workflow(root.path(), "b", "b", "1.0", &["a/1.0"]);
        let registry = scan(root.path());

        let mut seen = SeenSet::new();
        let reports = resolve::<NoProbe>(
            &root.path().join("a"),
            &registry,
            &mut seen,
            ResolveOptions { rewrite: false, recurse: true },
            None,
        )
        .await
        .unwrap();

        // a's report, b's report, then a again with nothing new to say.
        assert!(reports.len() >= 2);
        let total_entries: usize = reports.iter().map(|r| r.entries.len()).sum();
        assert_eq!(total_entries, 2);
        assert_eq!(seen.len(), 2);
    }

    #[tokio::test]
    async fn rewrite_updates_document_and_second_run_shows_no_drift() {
        let root = TempDir::new().unwrap();
        make_workflow(root.path(), "x", "x", "2.0", &[]);
        make_workflow(root.path(), "wf", "wf_bin", "1.0", &["x/1.0"]);
        let registry = scan(root.path());

        let opts = ResolveOptions { rewrite: true, recurse: false };
        let mut seen = SeenSet::new();
        let reports =
            resolve::<NoProbe>(&root.path().join("wf"), &registry, &mut seen, opts, None)
                .await
                .unwrap();
        assert!(reports[0].rewritten);

        // Fresh seen set per top-level run.
        let mut seen = SeenSet::new();
        let reports =
            resolve::<NoProbe>(&root.path().join("wf"), &registry, &mut seen, opts, None)
                .await
                .unwrap();
        assert_eq!(reports[0].entries[0].status, Status::Match);
        assert!(!reports[0].rewritten);
    }

    #[tokio::test]
    async fn recursion_skips_dependencies_without_a_document() {
        let root = TempDir::new().unwrap();
        make_workflow(root.path(), "leaf", "leaf", "1.0", &[]);
        fs::remove_file(root.path().join("leaf/tool.xml")).unwrap();
        make_workflow(root.path(), "wf", "wf_bin", "1.0", &["leaf/1.0"]);
        let registry = scan(root.path());

        let mut seen = SeenSet::new();
        let reports = resolve::<NoProbe>(
            &root.path().join("wf"),
            &registry,
            &mut seen,
            ResolveOptions { rewrite: false, recurse: true },
            None,
        )
        .await
        .unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].entries[0].status, Status::Match);
    }

    struct FailingProbe;
    impl DeployedProbe for FailingProbe {
        async fn is_deployed(&self, _name: &str, _version: &str) -> Result<bool> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn failed_probe_is_recorded_as_not_deployed() {
        let root = TempDir::new().unwrap();
        make_workflow(root.path(), "x", "x", "1.0", &[]);
        make_workflow(root.path(), "wf", "wf_bin", "1.0", &["x/1.0"]);
        let registry = scan(root.path());

        let mut seen = SeenSet::new();
        let reports = resolve(
            &root.path().join("wf"),
            &registry,
            &mut seen,
            ResolveOptions::default(),
            Some(&FailingProbe),
        )
        .await
        .unwrap();

        assert_eq!(reports[0].entries[0].remotely_deployed, Some(false));
    }
}
