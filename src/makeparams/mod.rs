//! Parameter source: the per-directory `Makefile` declaration file.
//!
//! Each workflow or tool directory declares itself through plain `KEY=VALUE`
//! lines in its Makefile. This module reads those lines into a [`ParamSet`]
//! (preserving the file's modification time for manifest listings) and
//! provides the typed [`WorkflowParams`] view that the rest of the system
//! consumes: required keys become fields, and a missing required key is a
//! [`WfdError::MissingParameter`] rather than a bare lookup failure.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;

use crate::constants::{
    KEY_TOOL_FOLDER_NAME, KEY_WORKFLOW_DESCRIPTION, KEY_WORKFLOW_LABEL, KEY_WORKFLOW_NAME,
    KEY_WORKFLOW_VERSION, PARAMETER_FILE,
};
use crate::core::WfdError;

/// Raw key/value pairs read from one directory's Makefile.
#[derive(Debug, Clone)]
pub struct ParamSet {
    values: HashMap<String, String>,
    /// Last modification time of the Makefile, used by manifest listings.
    pub modified: DateTime<Utc>,
}

impl ParamSet {
    /// Reads the Makefile inside `dir`.
    ///
    /// A line contributes a pair when its text before the first `=` is a
    /// non-empty token without whitespace; the value keeps any further `=`
    /// characters. Everything else (recipes, comments, blank lines) is
    /// ignored. A missing or unreadable file is an error so registry scans
    /// can observe and skip the directory.
    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join(PARAMETER_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            WfdError::ParameterFileUnreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        let modified = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        let mut values = HashMap::new();
        for line in content.lines() {
            let parts: Vec<&str> = line.trim_end().splitn(2, '=').collect();
            if parts.len() == 2 && !parts[0].is_empty() && !parts[0].contains(char::is_whitespace) {
                values.insert(parts[0].to_string(), parts[1].to_string());
            }
        }

        Ok(Self { values, modified })
    }

    /// Looks up a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Looks up a required key, producing a typed error naming the directory.
    pub fn require(&self, key: &str, dir: &Path) -> Result<String> {
        self.get(key).map(ToString::to_string).ok_or_else(|| {
            WfdError::MissingParameter { key: key.to_string(), dir: dir.display().to_string() }
                .into()
        })
    }
}

/// Validated deployment parameters for one workflow directory.
#[derive(Debug, Clone)]
pub struct WorkflowParams {
    /// Workflow name on the target (`WORKFLOW_NAME`).
    pub name: String,
    /// Tool folder the bundle publishes into (`TOOL_FOLDER_NAME`).
    pub tool_name: String,
    /// Declared version (`WORKFLOW_VERSION`).
    pub version: String,
    /// Optional display label (`WORKFLOW_LABEL`).
    pub label: Option<String>,
    /// Optional description paragraph (`WORKFLOW_DESCRIPTION`).
    pub description: Option<String>,
}

impl WorkflowParams {
    /// Builds the typed view from a directory's parameter set.
    ///
    /// `WORKFLOW_NAME`, `TOOL_FOLDER_NAME` and `WORKFLOW_VERSION` are
    /// mandatory; label and description are optional.
    pub fn from_params(params: &ParamSet, dir: &Path) -> Result<Self> {
        Ok(Self {
            name: params.require(KEY_WORKFLOW_NAME, dir)?,
            tool_name: params.require(KEY_TOOL_FOLDER_NAME, dir)?,
            version: params.require(KEY_WORKFLOW_VERSION, dir)?,
            label: params.get(KEY_WORKFLOW_LABEL).map(ToString::to_string),
            description: params.get(KEY_WORKFLOW_DESCRIPTION).map(ToString::to_string),
        })
    }

    /// Convenience: read and validate in one step.
    pub fn load(dir: &Path) -> Result<Self> {
        let params = ParamSet::read(dir)?;
        Self::from_params(&params, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_makefile(dir: &Path, content: &str) {
        fs::write(dir.join(PARAMETER_FILE), content).unwrap();
    }

    #[test]
    fn parses_key_value_lines_and_ignores_recipes() {
        let dir = TempDir::new().unwrap();
        write_makefile(
            dir.path(),
            "WORKFLOW_NAME=demo\nWORKFLOW_VERSION=1.2\n\ndeploy:\n\tfab deploy\n# comment\n",
        );

        let params = ParamSet::read(dir.path()).unwrap();
        assert_eq!(params.get("WORKFLOW_NAME"), Some("demo"));
        assert_eq!(params.get("WORKFLOW_VERSION"), Some("1.2"));
        assert_eq!(params.get("deploy:"), None);
    }

    #[test]
    fn value_may_contain_equals_sign() {
        let dir = TempDir::new().unwrap();
        write_makefile(dir.path(), "WORKFLOW_DESCRIPTION=precursor=2.0Da search\n");

        let params = ParamSet::read(dir.path()).unwrap();
        assert_eq!(params.get("WORKFLOW_DESCRIPTION"), Some("precursor=2.0Da search"));
    }

    #[test]
    fn missing_makefile_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(ParamSet::read(dir.path()).is_err());
    }

    #[test]
    fn missing_required_key_is_typed() {
        let dir = TempDir::new().unwrap();
        write_makefile(dir.path(), "WORKFLOW_NAME=demo\nTOOL_FOLDER_NAME=demo_bin\n");

        let err = WorkflowParams::load(dir.path()).unwrap_err();
        match err.downcast_ref::<WfdError>() {
            Some(WfdError::MissingParameter { key, .. }) => {
                assert_eq!(key, KEY_WORKFLOW_VERSION);
            }
            other => panic!("expected MissingParameter, got {other:?}"),
        }
    }

    #[test]
    fn full_params_round_trip() {
        let dir = TempDir::new().unwrap();
        write_makefile(
            dir.path(),
            "WORKFLOW_NAME=demo\nTOOL_FOLDER_NAME=demo_bin\nWORKFLOW_VERSION=1.0\nWORKFLOW_LABEL=Demo Search\n",
        );

        let params = WorkflowParams::load(dir.path()).unwrap();
        assert_eq!(params.name, "demo");
        assert_eq!(params.tool_name, "demo_bin");
        assert_eq!(params.version, "1.0");
        assert_eq!(params.label.as_deref(), Some("Demo Search"));
        assert!(params.description.is_none());
    }
}
