//! Version and path grammar shared by the dependency engine.
//!
//! Two concerns live here:
//!
//! 1. **The pinned-path grammar.** Dependency entries in tool.xml carry
//!    slash-delimited bases of the form `segments := NAME+ VERSION`: the final
//!    segment is the version, everything before it is the dependency name
//!    (names may themselves contain slashes, e.g. namespaced tools). A
//!    single-segment base has a name but no version and is reported with the
//!    [`UNVERSIONED`](crate::constants::UNVERSIONED) sentinel, never conflated
//!    with a real version string.
//!
//! 2. **Branch-suffixed workflow versions.** Outside production, a workflow
//!    deployed from a non-default, non-detached git branch gets a `+branch`
//!    suffix appended to its declared version so parallel branch deployments
//!    do not overwrite each other. Production versions never carry a suffix.

use std::path::Path;
use tokio::process::Command;

use crate::constants::{DEFAULT_BRANCHES, UNVERSIONED};

/// A parsed `name/version` dependency base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedPath {
    /// Dependency name; may contain slashes.
    pub name: String,
    /// Declared version, or the unversioned sentinel.
    pub version: String,
}

impl VersionedPath {
    /// Parses a slash-delimited base path.
    ///
    /// The last segment is the version and the rest form the name. A single
    /// segment yields the unversioned sentinel. Empty input parses to an
    /// empty name with the sentinel; callers filter such entries upstream.
    pub fn parse(base: &str) -> Self {
        let trimmed = base.trim_matches('/');
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Self { name: String::new(), version: UNVERSIONED.to_string() },
            [only] => Self { name: (*only).to_string(), version: UNVERSIONED.to_string() },
            [name @ .., version] => {
                Self { name: name.join("/"), version: (*version).to_string() }
            }
        }
    }

    /// Whether this entry carries no version segment.
    pub fn is_unversioned(&self) -> bool {
        self.version == UNVERSIONED
    }
}

/// Replaces the version segment of `base` when it starts with `name`
/// followed by exactly the `from` version segment, preserving any trailing
/// sub-path segments beyond name/version.
///
/// Requiring the `from` match keeps a short name from clobbering a
/// namespaced sibling: an update for `a` must never touch `a/b/1.0`, whose
/// dependency name is `a/b`. Returns `None` when the base does not match or
/// the version already equals `to`.
pub fn replace_version(base: &str, name: &str, from: &str, to: &str) -> Option<String> {
    let rest = base.strip_prefix(name)?;
    let rest = rest.strip_prefix('/')?;

    let (version, trailing) = match rest.split_once('/') {
        Some((v, t)) => (v, Some(t)),
        None => (rest, None),
    };
    if version != from || version == to {
        return None;
    }

    Some(match trailing {
        Some(t) => format!("{name}/{to}/{t}"),
        None => format!("{name}/{to}"),
    })
}

/// Computes the version a deployment should actually publish under.
///
/// In production the declared version is used as-is. Otherwise the workflow
/// directory's git branch is consulted: a non-default, non-detached branch
/// contributes a `+branch` suffix with spaces replaced by underscores. Any
/// git failure (not a repository, git missing) falls back to the bare
/// declared version.
pub async fn effective_version(declared: &str, workflow_dir: &Path, production: bool) -> String {
    if production {
        return declared.to_string();
    }
    match current_branch(workflow_dir).await {
        Some(branch) if !DEFAULT_BRANCHES.contains(&branch.as_str()) => {
            suffixed(declared, &branch)
        }
        _ => declared.to_string(),
    }
}

/// Appends a branch suffix, with spaces normalized to underscores.
fn suffixed(declared: &str, branch: &str) -> String {
    format!("{}+{}", declared, branch.replace(' ', "_"))
}

/// Returns the current branch name for `dir`, or `None` when the directory
/// is not a repository or HEAD is detached.
async fn current_branch(dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["symbolic-ref", "--short", "-q", "HEAD"])
        .current_dir(dir)
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        tracing::debug!(
            "no symbolic HEAD in {} (detached or not a repository)",
            dir.display()
        );
        return None;
    }
    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if branch.is_empty() { None } else { Some(branch) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;
    use tempfile::TempDir;

    #[test]
    fn parses_two_segment_base() {
        let parsed = VersionedPath::parse("speclib/1.3");
        assert_eq!(parsed.name, "speclib");
        assert_eq!(parsed.version, "1.3");
        assert!(!parsed.is_unversioned());
    }

    #[test]
    fn parses_namespaced_name() {
        let parsed = VersionedPath::parse("shared/models/2.0");
        assert_eq!(parsed.name, "shared/models");
        assert_eq!(parsed.version, "2.0");
    }

    #[test]
    fn single_segment_reports_unversioned_sentinel() {
        let parsed = VersionedPath::parse("spectra");
        assert_eq!(parsed.name, "spectra");
        assert!(parsed.is_unversioned());
    }

    #[test]
    fn replace_version_simple() {
        assert_eq!(
            replace_version("speclib/1.3", "speclib", "1.3", "2.0").as_deref(),
            Some("speclib/2.0")
        );
    }

    #[test]
    fn replace_version_preserves_trailing_segments() {
        assert_eq!(
            replace_version("speclib/1.3/bin", "speclib", "1.3", "2.0").as_deref(),
            Some("speclib/2.0/bin")
        );
    }

    #[test]
    fn replace_version_requires_leading_name_match() {
        assert!(replace_version("other/1.3", "speclib", "1.3", "2.0").is_none());
        // A name that merely shares a prefix must not match.
        assert!(replace_version("speclib2/1.3", "speclib", "1.3", "2.0").is_none());
    }

    #[test]
    fn replace_version_requires_the_from_version_to_match() {
        assert!(replace_version("speclib/1.2", "speclib", "1.3", "2.0").is_none());
    }

    #[test]
    fn short_name_never_matches_a_namespaced_sibling() {
        // The base belongs to dependency a/b; an update for a must not touch it.
        assert!(replace_version("a/b/1.0", "a", "1.0", "2.0").is_none());
        assert_eq!(replace_version("a/b/1.0", "a/b", "1.0", "2.0").as_deref(), Some("a/b/2.0"));
    }

    #[test]
    fn replace_version_is_noop_when_already_current() {
        assert!(replace_version("speclib/2.0", "speclib", "1.3", "2.0").is_none());
    }

    fn git(dir: &std::path::Path, args: &[&str]) {
        StdCommand::new("git").args(args).current_dir(dir).output().unwrap();
    }

    #[tokio::test]
    async fn production_version_never_gets_a_suffix() {
        let dir = TempDir::new().unwrap();
        assert_eq!(effective_version("1.0", dir.path(), true).await, "1.0");
    }

    #[tokio::test]
    async fn non_repo_directory_falls_back_to_declared() {
        let dir = TempDir::new().unwrap();
        assert_eq!(effective_version("1.0", dir.path(), false).await, "1.0");
    }

    #[tokio::test]
    async fn feature_branch_appends_suffix() {
        let dir = TempDir::new().unwrap();
        git(dir.path(), &["init", "-b", "feature-work"]);
        assert_eq!(effective_version("1.0", dir.path(), false).await, "1.0+feature-work");
    }

    #[test]
    fn spaces_in_branch_names_become_underscores() {
        assert_eq!(suffixed("1.0", "my branch"), "1.0+my_branch");
    }

    #[tokio::test]
    async fn default_branch_has_no_suffix() {
        let dir = TempDir::new().unwrap();
        git(dir.path(), &["init", "-b", "main"]);
        assert_eq!(effective_version("1.0", dir.path(), false).await, "1.0");
    }
}
