//! Global constants used throughout wfdeploy.
//!
//! Component names, well-known Makefile keys, placeholder tokens and polling
//! parameters live here so the magic strings shared by the templater, the
//! dependency engine and the deployment engine stay in one place.

use std::time::Duration;

/// The workflow component documents considered for templating and upload,
/// in deployment order.
pub const WORKFLOW_COMPONENTS: [&str; 5] =
    ["input.xml", "binding.xml", "flow.xml", "result.xml", "tool.xml"];

/// File name of the dependency document inside a workflow directory.
pub const DEPENDENCY_DOCUMENT: &str = "tool.xml";

/// File name of the per-directory parameter source.
pub const PARAMETER_FILE: &str = "Makefile";

/// Placeholder token in tool.xml path entries that stands for the workflow's
/// own artifact root, substituted with `<tool>/<version>` at render time.
pub const BASE_PLACEHOLDER: &str = "$base";

/// Sentinel recorded when a pinned dependency path carries no version segment.
///
/// A single-segment base like `spectra` has a name but no version; reporting
/// this sentinel keeps "unversioned" distinguishable from any real version.
pub const UNVERSIONED: &str = "<unversioned>";

/// Makefile key declaring the workflow's name.
pub const KEY_WORKFLOW_NAME: &str = "WORKFLOW_NAME";

/// Makefile key declaring the tool folder the workflow publishes into.
pub const KEY_TOOL_FOLDER_NAME: &str = "TOOL_FOLDER_NAME";

/// Makefile key declaring the workflow's version.
pub const KEY_WORKFLOW_VERSION: &str = "WORKFLOW_VERSION";

/// Makefile key declaring an optional human-readable label.
pub const KEY_WORKFLOW_LABEL: &str = "WORKFLOW_LABEL";

/// Makefile key declaring an optional description paragraph.
pub const KEY_WORKFLOW_DESCRIPTION: &str = "WORKFLOW_DESCRIPTION";

/// Interval between portal status polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Default total budget for waiting on a portal task to reach a terminal state.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(3600);

/// Branches that never contribute a version suffix.
pub const DEFAULT_BRANCHES: [&str; 2] = ["master", "main"];
