//! wfdeploy - workflow deployment for ProteoSAFe-style clusters
//!
//! Deploys versioned workflow definitions (XML component documents plus tool
//! bundles) from a flat source repository onto a local or remote execution
//! cluster, and keeps the version pins inside each workflow's `tool.xml`
//! reconciled against what the repository actually contains.
//!
//! # Model
//!
//! A workflow repository is a directory of sibling workflow directories. Each
//! one carries a `Makefile` of `KEY=VALUE` parameters naming the workflow, its
//! tool folder and its version, plus up to five component documents
//! (`input.xml`, `binding.xml`, `flow.xml`, `result.xml`, `tool.xml`).
//! Deployment renders the components with the declared identity stamped in,
//! copies them to a versioned directory under the target's workflows root, and
//! ships the tool bundle as a tar stream to the tools root.
//!
//! # Core Modules
//!
//! - [`registry`] - scan of the repository for locally available tool versions
//! - [`deps`] - dependency extraction, drift reconciliation and pin rewriting
//! - [`templating`] - per-component rendering of identity and tool paths
//! - [`deploy`] - staging, transfer and placement on the target
//! - [`channel`] - local or SSH command execution and file upload
//! - [`portal`] - task submission, status polling and regression checks
//!
//! # Supporting Modules
//!
//! - [`cli`] - command-line interface
//! - [`config`] - `wfdeploy.toml` parsing and validation
//! - [`core`] - error types and user-facing error contexts
//! - [`makeparams`] - `Makefile` parameter extraction
//! - [`version`] - versioned-path parsing and branch-aware version derivation
//! - [`xmldoc`] - thin XML document wrapper shared by templating and deps

pub mod channel;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod deploy;
pub mod deps;
pub mod makeparams;
pub mod portal;
pub mod registry;
pub mod templating;
pub mod version;
pub mod xmldoc;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
