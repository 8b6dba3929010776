//! The dependency engine: extraction, reconciliation and declaration rewrite.
//!
//! A workflow's tool.xml enumerates path-based references to tool bundles.
//! [`extract`](extract::extract) pulls those references out,
//! [`resolver`] diffs each declared version against the locally available one
//! from the [`Registry`](crate::registry::Registry), and
//! [`rewrite`](rewrite::rewrite) patches the document in place to pin the
//! resolved local versions.

pub mod extract;
pub mod resolver;
pub mod rewrite;

pub use extract::{DependencyRef, extract};
pub use resolver::{
    DeployedProbe, NoProbe, ReconciliationEntry, ReconciliationReport, ResolveOptions, SeenSet,
    Status, resolve,
};
pub use rewrite::{PinUpdate, rewrite};
