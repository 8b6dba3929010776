//! Error handling for wfdeploy
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`WfdError`]) for precise handling in code
//! 2. **User-friendly messages** ([`ErrorContext`]) with actionable suggestions
//!    for CLI users
//!
//! # Taxonomy
//!
//! - **Configuration**: [`WfdError::ConfigNotFound`], [`WfdError::ConfigParseError`],
//!   [`WfdError::MissingParameter`]. A required declared value is absent; fatal to
//!   the single workflow or tool being processed.
//! - **Registry**: [`WfdError::RegistryScanError`]. A candidate directory could
//!   not be read; the scanner recovers by skipping it, so this variant surfaces
//!   only when the repository root itself is unreadable.
//! - **Remote execution**: [`WfdError::RemoteCommandFailed`],
//!   [`WfdError::UploadFailed`]. Non-zero exit or connectivity failure from the
//!   execution channel. Never retried; the caller aborts that item's deployment.
//! - **Documents**: [`WfdError::DocumentParseError`], [`WfdError::DocumentWriteError`].
//!   A workflow component could not be parsed or serialized.
//! - **Polling**: [`WfdError::PollTimeout`]. A watched task did not reach a
//!   terminal state within budget.
//!
//! Structural validation findings are deliberately *not* errors: they are logged
//! as warnings and never block deployment (see `templating::validate`).
//!
//! # Conversions
//!
//! [`std::io::Error`], [`toml::de::Error`] and [`reqwest::Error`] convert
//! automatically. Use [`user_friendly_error`] at the CLI boundary to turn any
//! [`anyhow::Error`] into a displayable context with suggestions.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for wfdeploy operations.
///
/// Each variant represents a specific failure mode and carries the context a
/// user needs to act on it (workflow name, path, command, stderr).
#[derive(Error, Debug)]
pub enum WfdError {
    /// Configuration file wfdeploy.toml not found in the current directory or
    /// any parent directory.
    #[error("Configuration file wfdeploy.toml not found in current directory or any parent directory")]
    ConfigNotFound,

    /// Configuration file exists but could not be parsed.
    #[error("Invalid configuration file syntax in {file}")]
    ConfigParseError {
        /// Path to the configuration file that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// A required key is missing from a workflow directory's Makefile.
    ///
    /// This is the typed form of "declared version / tool name absent": the
    /// offending directory's contribution is fatal, the surrounding scan is not.
    #[error("Missing required parameter '{key}' in {dir}/Makefile")]
    MissingParameter {
        /// The Makefile key that was required but absent
        key: String,
        /// The workflow directory whose Makefile was read
        dir: String,
    },

    /// The Makefile (parameter source) for a directory is absent or unreadable.
    #[error("Cannot read parameter file {path}")]
    ParameterFileUnreadable {
        /// Path to the Makefile that could not be read
        path: String,
        /// Underlying reason
        reason: String,
    },

    /// A single candidate directory failed during a registry scan.
    #[error("Failed to scan candidate directory {path}")]
    RegistryScanError {
        /// The directory that could not be scanned
        path: String,
        /// Underlying reason
        reason: String,
    },

    /// A command run through the execution channel exited non-zero.
    #[error("Remote command failed: {command}")]
    RemoteCommandFailed {
        /// The command that was executed
        command: String,
        /// Captured stderr from the command
        stderr: String,
    },

    /// A file upload through the execution channel failed.
    #[error("Failed to upload {local} to {remote}")]
    UploadFailed {
        /// Local source path
        local: String,
        /// Remote destination path
        remote: String,
        /// Underlying reason
        reason: String,
    },

    /// A workflow component document could not be parsed.
    #[error("Failed to parse document {path}")]
    DocumentParseError {
        /// Path to the document that failed to parse
        path: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// A rendered document could not be written out.
    #[error("Failed to write document {path}")]
    DocumentWriteError {
        /// Path to the document that failed to serialize
        path: String,
        /// Specific reason for the write failure
        reason: String,
    },

    /// A tool document was rendered without a destination tool name.
    ///
    /// tool.xml references the workflow's own artifact root through a `$base`
    /// placeholder that must be substituted with `<tool_name>/<version>`;
    /// without a tool name the render cannot proceed.
    #[error("Cannot render tool document for '{workflow}' without a tool folder name")]
    ToolNameRequired {
        /// The workflow whose tool document was being rendered
        workflow: String,
    },

    /// The dependency document (tool.xml) for a workflow is missing.
    #[error("Dependency document not found for workflow '{workflow}' (expected {path})")]
    DependencyDocumentNotFound {
        /// The workflow being resolved
        workflow: String,
        /// The path where tool.xml was expected
        path: String,
    },

    /// A watched portal task did not reach a terminal state within budget.
    #[error("Task {task_id} did not finish within {max_wait_secs} seconds")]
    PollTimeout {
        /// The task being watched
        task_id: String,
        /// The total wait budget that was exceeded
        max_wait_secs: u64,
    },

    /// The portal rejected a task submission or returned an implausible task id.
    #[error("Portal task submission failed: {reason}")]
    TaskSubmissionFailed {
        /// Why the submission was rejected
        reason: String,
    },

    /// A post-deploy regression check found differing result counts.
    #[error("Regression check failed for view '{view}': {old_task} has {old_count} rows, {new_task} has {new_count}")]
    RegressionCheckFailed {
        /// The baseline task
        old_task: String,
        /// The re-run task
        new_task: String,
        /// The result view that was compared
        view: String,
        /// Row count of the baseline task
        old_count: usize,
        /// Row count of the re-run task
        new_count: usize,
    },

    /// IO operation failed
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing failed
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// HTTP request to the portal failed
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Generic error with a message
    #[error("{message}")]
    Other {
        /// The error message
        message: String,
    },
}

/// Wrapper that pairs a [`WfdError`] with an optional suggestion and details
/// for terminal display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: WfdError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Creates a new error context with no suggestion or details.
    pub const fn new(error: WfdError) -> Self {
        Self { error, suggestion: None, details: None }
    }

    /// Adds a suggestion for resolving the error.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Adds additional details about the error.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prints the error to stderr with colored formatting.
    pub fn display(&self) {
        eprintln!("{} {}", "Error:".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("\n{} {}", "Details:".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("\n{} {}", "Suggestion:".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Converts any error into a user-friendly [`ErrorContext`] with suggestions.
///
/// Known [`WfdError`] variants get tailored suggestions; IO and TOML errors get
/// generic but actionable ones; everything else is displayed with its full
/// cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    match error.downcast::<WfdError>() {
        Ok(wfd_error) => create_error_context(wfd_error),
        Err(other) => generic_error_context(other),
    }
}

fn generic_error_context(error: anyhow::Error) -> ErrorContext {
    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(WfdError::Other { message: error.to_string() })
                    .with_suggestion(
                        "Check file ownership, or use production mode so writes go through the production user",
                    )
                    .with_details("wfdeploy does not have permission to read or write a local file");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(WfdError::Other { message: error.to_string() })
                    .with_suggestion(
                        "Check that the file or directory exists and the path is correct",
                    );
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(WfdError::ConfigParseError {
            file: "wfdeploy.toml".to_string(),
            reason: toml_error.to_string(),
        })
        .with_suggestion(
            "Check the TOML syntax in wfdeploy.toml: quotes, brackets, and table headers",
        );
    }

    // Generic error: include the full cause chain for diagnostics.
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(WfdError::Other { message })
}

/// Maps each [`WfdError`] variant to a context with tailored suggestions.
fn create_error_context(error: WfdError) -> ErrorContext {
    let (suggestion, details): (Option<&str>, Option<&str>) = match &error {
        WfdError::ConfigNotFound => (
            Some("Create a wfdeploy.toml in the repository root describing the target host and roots"),
            Some("wfdeploy searches the current directory and its parents for wfdeploy.toml"),
        ),
        WfdError::MissingParameter { key, .. } => match key.as_str() {
            "WORKFLOW_VERSION" => (
                Some("Add WORKFLOW_VERSION=<version> to the workflow's Makefile"),
                Some("Every deployable workflow must declare its version in the Makefile"),
            ),
            "TOOL_FOLDER_NAME" => (
                Some("Add TOOL_FOLDER_NAME=<name> to the workflow's Makefile"),
                Some("The tool folder name is where the workflow's tool bundle is published"),
            ),
            _ => (Some("Add the missing KEY=VALUE line to the workflow's Makefile"), None),
        },
        WfdError::RemoteCommandFailed { .. } => (
            Some("Check connectivity to the target host and that the deploy user can run the command"),
            Some("Remote commands are attempted once and never retried"),
        ),
        WfdError::ToolNameRequired { .. } => (
            Some("Set TOOL_FOLDER_NAME in the Makefile of the workflow being deployed"),
            Some("tool.xml references the workflow's own artifact root through a $base placeholder that resolves to <tool>/<version>"),
        ),
        WfdError::DependencyDocumentNotFound { .. } => {
            (Some("Check that the workflow directory contains a tool.xml"), None)
        }
        WfdError::PollTimeout { .. } => {
            (Some("Increase --max-wait, or check the portal for a stuck task"), None)
        }
        _ => (None, None),
    };

    let mut ctx = ErrorContext::new(error);
    if let Some(s) = suggestion {
        ctx = ctx.with_suggestion(s);
    }
    if let Some(d) = details {
        ctx = ctx.with_details(d);
    }
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_parameter_displays_key_and_dir() {
        let err = WfdError::MissingParameter {
            key: "WORKFLOW_VERSION".to_string(),
            dir: "demo".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing required parameter 'WORKFLOW_VERSION' in demo/Makefile"
        );
    }

    #[test]
    fn context_display_includes_suggestion_and_details() {
        let ctx = ErrorContext::new(WfdError::ConfigNotFound)
            .with_suggestion("create one")
            .with_details("searched upward");
        let text = format!("{ctx}");
        assert!(text.contains("wfdeploy.toml"));
        assert!(text.contains("Suggestion: create one"));
        assert!(text.contains("Details: searched upward"));
    }

    #[test]
    fn user_friendly_error_maps_known_variant() {
        let err = anyhow::Error::from(WfdError::ConfigNotFound);
        let ctx = user_friendly_error(err);
        assert!(ctx.suggestion.is_some());
    }

    #[test]
    fn user_friendly_error_keeps_cause_chain() {
        let err = anyhow::anyhow!("inner").context("outer");
        let ctx = user_friendly_error(err);
        match ctx.error {
            WfdError::Other { message } => {
                assert!(message.contains("outer"));
                assert!(message.contains("inner"));
            }
            other => panic!("expected Other, got {other:?}"),
        }
    }
}
