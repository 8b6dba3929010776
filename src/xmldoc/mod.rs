//! Document store: parse, query and serialize workflow XML components.
//!
//! A thin layer over [`xmltree`] that ties an editable element tree to the
//! path it came from, converts parse/serialize failures into the crate's
//! error taxonomy, and offers the one structural query the dependency engine
//! needs (iterating `pathSet` entries in document order).

use anyhow::Result;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub use xmltree::{Element, XMLNode};

use crate::core::WfdError;

/// Tag of the dependency-path entries inside a tool document.
pub const PATH_SET_TAG: &str = "pathSet";

/// Attribute on a `pathSet` element holding the slash-delimited base path.
pub const BASE_ATTR: &str = "base";

/// An editable XML document tied to its source path.
#[derive(Debug, Clone)]
pub struct Document {
    /// Root element of the parsed tree.
    pub root: Element,
    path: PathBuf,
}

impl Document {
    /// Parses the document at `path`.
    pub fn parse(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| WfdError::DocumentParseError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let root =
            Element::parse(BufReader::new(file)).map_err(|e| WfdError::DocumentParseError {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { root, path: path.to_path_buf() })
    }

    /// The path this document was parsed from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serializes the tree to an arbitrary destination, leaving the source
    /// untouched. Used by the templater, which never mutates inputs in place.
    pub fn write_to(&self, dest: &Path) -> Result<()> {
        let file = File::create(dest).map_err(|e| WfdError::DocumentWriteError {
            path: dest.display().to_string(),
            reason: e.to_string(),
        })?;
        self.root.write(file).map_err(|e| WfdError::DocumentWriteError {
            path: dest.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Serializes the tree back over its source path. Used by the declaration
    /// rewriter after a version update.
    pub fn write_back(&self) -> Result<()> {
        let path = self.path.clone();
        self.write_to(&path)
    }

    /// Iterates the `base` attributes of every `pathSet` child of the root,
    /// in document order.
    pub fn path_set_bases(&self) -> impl Iterator<Item = &str> {
        self.root.children.iter().filter_map(|node| match node {
            XMLNode::Element(el) if el.name == PATH_SET_TAG => {
                el.attributes.get(BASE_ATTR).map(String::as_str)
            }
            _ => None,
        })
    }

    /// Mutable access to every `pathSet` element of the root, in document
    /// order.
    pub fn path_sets_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.root.children.iter_mut().filter_map(|node| match node {
            XMLNode::Element(el) if el.name == PATH_SET_TAG => Some(el),
            _ => None,
        })
    }
}
