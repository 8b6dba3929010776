//! Tool registry: the locally declared version of every tool in the
//! repository.
//!
//! A scan enumerates the immediate subdirectories of the repository root
//! (skipping the configured exclusion, normally the deployment tooling's own
//! directory), reads each one's Makefile, and records a
//! [`ToolRecord`] for every directory that declares a `TOOL_FOLDER_NAME`.
//!
//! Scans are fresh every invocation; nothing is cached or persisted. A
//! directory whose Makefile is missing or unreadable is skipped (an unrelated
//! or malformed directory must not abort the whole scan), but every skip is
//! counted and logged so failures stay observable. A directory that declares
//! a tool name *without* a version is a hard error for that directory's
//! contribution.
//!
//! Two directories declaring the same tool name is not prevented: the
//! last-scanned directory wins. This is a known limitation, not a guaranteed
//! correctness property.

use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::constants::{KEY_TOOL_FOLDER_NAME, KEY_WORKFLOW_VERSION};
use crate::core::WfdError;
use crate::makeparams::ParamSet;

/// One tool discovered by a registry scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRecord {
    /// Declared tool folder name.
    pub name: String,
    /// Locally declared version.
    pub version: String,
    /// Directory the declaration came from.
    pub location: PathBuf,
}

/// The result of scanning a repository root.
#[derive(Debug, Default)]
pub struct Registry {
    tools: HashMap<String, ToolRecord>,
    /// Candidate directories skipped because their parameter source was
    /// missing or unreadable.
    pub skipped: usize,
    /// Directories that declared a tool name but no version. Their
    /// contribution is lost; the scan itself carries on.
    pub invalid: Vec<(PathBuf, String)>,
}

impl Registry {
    /// Scans the immediate subdirectories of `root`, excluding `exclude`.
    pub fn scan(root: &Path, exclude: &str) -> Result<Self> {
        let mut registry = Self::default();

        let entries = std::fs::read_dir(root).map_err(|e| WfdError::RegistryScanError {
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut dirs: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .filter(|p| p.file_name().is_some_and(|n| n != exclude))
            .collect();
        // Deterministic scan order so duplicate-name resolution is stable
        // between runs over an unchanged tree.
        dirs.sort();

        for dir in dirs {
            match registry.scan_candidate(&dir) {
                Ok(()) => {}
                Err(e) => {
                    // A tool name without a version is a configuration error
                    // that kills this directory's contribution; an unreadable
                    // Makefile just means the directory is not a tool. Either
                    // way the scan carries on.
                    if e.downcast_ref::<WfdError>()
                        .is_some_and(|w| matches!(w, WfdError::MissingParameter { .. }))
                    {
                        warn!("{} contributes no registry entry: {e:#}", dir.display());
                        registry.invalid.push((dir, e.to_string()));
                    } else {
                        registry.skipped += 1;
                        debug!("skipping {}: {e:#}", dir.display());
                    }
                }
            }
        }

        if registry.skipped > 0 {
            warn!(
                "registry scan of {} skipped {} unreadable candidate(s)",
                root.display(),
                registry.skipped
            );
        }
        debug!("registry scan found {} tool(s)", registry.tools.len());
        Ok(registry)
    }

    /// Reads one candidate directory's declaration.
    fn scan_candidate(&mut self, dir: &Path) -> Result<()> {
        let params = ParamSet::read(dir)?;

        // Directories without a tool folder name are simply not tools.
        let Some(name) = params.get(KEY_TOOL_FOLDER_NAME) else {
            return Ok(());
        };
        let version = params.require(KEY_WORKFLOW_VERSION, dir)?;

        if let Some(previous) = self.tools.get(name) {
            warn!(
                "tool '{}' declared by both {} and {}; keeping the latter",
                name,
                previous.location.display(),
                dir.display()
            );
        }
        self.tools.insert(
            name.to_string(),
            ToolRecord { name: name.to_string(), version, location: dir.to_path_buf() },
        );
        Ok(())
    }

    /// Looks up a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolRecord> {
        self.tools.get(name)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the scan found no tools.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Iterates all records in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolRecord> {
        self.tools.values()
    }
}
