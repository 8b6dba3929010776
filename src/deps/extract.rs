//! Dependency extraction from a workflow's tool document.

use anyhow::Result;
use std::path::Path;

use crate::constants::{BASE_PLACEHOLDER, DEPENDENCY_DOCUMENT};
use crate::core::WfdError;
use crate::version::VersionedPath;
use crate::xmldoc::Document;

/// One pinned dependency reference, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRef {
    /// Dependency name; may contain slashes for namespaced tools.
    pub name: String,
    /// Version the document currently references, or the unversioned
    /// sentinel for single-segment bases.
    pub declared_version: String,
}

/// Extracts the ordered dependency references from `workflow_dir/tool.xml`.
///
/// Entries whose base contains the `$base` placeholder are the workflow's own
/// artifact root (substituted at deploy time by the templater) and are not
/// dependencies; everything else is parsed with the `NAME+ VERSION` grammar.
/// Duplicates by name are preserved; each sighting must be considered by the
/// resolver.
pub fn extract(workflow_dir: &Path) -> Result<Vec<DependencyRef>> {
    let path = workflow_dir.join(DEPENDENCY_DOCUMENT);
    if !path.is_file() {
        return Err(WfdError::DependencyDocumentNotFound {
            workflow: workflow_dir.display().to_string(),
            path: path.display().to_string(),
        }
        .into());
    }
    let doc = Document::parse(&path)?;

    let refs = doc
        .path_set_bases()
        .filter(|base| !base.contains(BASE_PLACEHOLDER))
        .map(|base| {
            let parsed = VersionedPath::parse(base);
            DependencyRef { name: parsed.name, declared_version: parsed.version }
        })
        .filter(|r| !r.name.is_empty())
        .collect();

    Ok(refs)
}
