//! Declaration rewriting: pinning tool.xml to resolved local versions.

use anyhow::Result;
use std::path::Path;
use tracing::{debug, info};

use crate::constants::{BASE_PLACEHOLDER, DEPENDENCY_DOCUMENT};
use crate::version::replace_version;
use crate::xmldoc::{BASE_ATTR, Document};

/// One staged pin change: move `name` from its declared version to the
/// locally available one.
///
/// Carrying the `from` version is what keeps a short name from rewriting a
/// namespaced sibling: an update for `a` matches `a/1.0` but never `a/b/1.0`,
/// whose version segment is `1.0` only after the name `a/b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinUpdate {
    /// Dependency name; may contain slashes.
    pub name: String,
    /// The version currently declared in the document.
    pub from: String,
    /// The version to pin instead.
    pub to: String,
}

/// Patches `workflow_dir/tool.xml` so every pinned entry matching an update's
/// `name/from` prefix points at the new version. Trailing sub-path segments
/// beyond `name/version` are preserved.
///
/// The document is written back only when at least one entry changed, so a
/// drift-free rewrite never touches the file's timestamp. Returns whether a
/// write occurred.
pub fn rewrite(workflow_dir: &Path, updates: &[PinUpdate]) -> Result<bool> {
    let path = workflow_dir.join(DEPENDENCY_DOCUMENT);
    let mut doc = Document::parse(&path)?;

    let mut changed = false;
    for element in doc.path_sets_mut() {
        let Some(base) = element.attributes.get(BASE_ATTR).cloned() else {
            continue;
        };
        if base.contains(BASE_PLACEHOLDER) {
            continue;
        }

        for update in updates {
            if let Some(new_base) = replace_version(&base, &update.name, &update.from, &update.to) {
                debug!("{}: {} -> {}", path.display(), base, new_base);
                element.attributes.insert(BASE_ATTR.to_string(), new_base);
                changed = true;
                break;
            }
        }
    }

    if changed {
        doc.write_back()?;
        info!("rewrote {} with {} update(s)", path.display(), updates.len());
    }
    Ok(changed)
}
