//! Component templating: rewriting workflow XML documents for a target
//! name/version before staging.
//!
//! Each of the five workflow components gets kind-specific treatment, taken
//! from how the portal consumes them:
//!
//! - `input.xml` / `result.xml`: `id` and `version` attributes are stamped;
//!   `input.xml` additionally gets the upper-cased workflow id, an optional
//!   display label, and an optional description block inserted as the first
//!   child.
//! - `flow.xml`: the `name` attribute is stamped.
//! - `tool.xml`: every `pathSet` whose base carries the `$base` placeholder
//!   has it substituted with `<tool>/<version>`. Rendering a tool document
//!   without a tool name is fatal.
//! - anything else passes through unmodified.
//!
//! Rendering always writes a staged copy; the source document stays the
//! canonical, unversioned original.

use anyhow::Result;
use std::path::Path;
use tracing::warn;

use crate::constants::{BASE_PLACEHOLDER, WORKFLOW_COMPONENTS};
use crate::core::WfdError;
use crate::xmldoc::{BASE_ATTR, Document, Element, XMLNode};

/// Separator between the label, description and version lines of an injected
/// description block, rendered as a horizontal rule by the portal.
const DESCRIPTION_SEPARATOR: &str = "<hr>";

/// Values stamped into rendered components.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    /// Workflow name on the target.
    pub name: &'a str,
    /// Version being published (possibly branch-suffixed).
    pub version: &'a str,
    /// Tool folder the bundle publishes into; required for tool documents.
    pub tool_name: Option<&'a str>,
    /// Optional display label.
    pub label: Option<&'a str>,
    /// Optional description paragraph. Not escaped beyond the serializer's
    /// own escaping; callers must not pass document-breaking content.
    pub description: Option<&'a str>,
}

/// Renders one component from `source` into `dest`.
///
/// Dispatch is by the component's file name; unknown components are copied
/// byte-for-byte.
pub fn render_component(
    component: &str,
    source: &Path,
    dest: &Path,
    ctx: &RenderContext<'_>,
) -> Result<()> {
    match component {
        "input.xml" => {
            let mut doc = Document::parse(source)?;
            stamp_identity(&mut doc.root, ctx);
            doc.root.attributes.insert("workflow".to_string(), ctx.name.to_uppercase());
            if let Some(label) = ctx.label {
                doc.root.attributes.insert("label".to_string(), label.to_string());
            }
            if let Some(description) = ctx.description {
                let block = description_block(ctx, description);
                doc.root.children.insert(0, XMLNode::Element(block));
            }
            doc.write_to(dest)
        }
        "result.xml" => {
            let mut doc = Document::parse(source)?;
            stamp_identity(&mut doc.root, ctx);
            doc.write_to(dest)
        }
        "flow.xml" => {
            let mut doc = Document::parse(source)?;
            doc.root.attributes.insert("name".to_string(), ctx.name.to_string());
            doc.write_to(dest)
        }
        "tool.xml" => {
            let tool_name = ctx.tool_name.ok_or_else(|| WfdError::ToolNameRequired {
                workflow: ctx.name.to_string(),
            })?;
            let mut doc = Document::parse(source)?;
            let resolved = format!("{}/{}", tool_name, ctx.version);
            for element in doc.path_sets_mut() {
                if let Some(base) = element.attributes.get(BASE_ATTR).cloned() {
                    if base.contains(BASE_PLACEHOLDER) {
                        element.attributes.insert(
                            BASE_ATTR.to_string(),
                            base.replace(BASE_PLACEHOLDER, &resolved),
                        );
                    }
                }
            }
            doc.write_to(dest)
        }
        _ => {
            std::fs::copy(source, dest).map_err(|e| WfdError::DocumentWriteError {
                path: dest.display().to_string(),
                reason: e.to_string(),
            })?;
            Ok(())
        }
    }
}

fn stamp_identity(root: &mut Element, ctx: &RenderContext<'_>) {
    root.attributes.insert("id".to_string(), ctx.name.to_string());
    root.attributes.insert("version".to_string(), ctx.version.to_string());
}

/// Builds the fixed-layout description block inserted at the top of
/// input.xml: block/row/cell/label/content with the heading, description and
/// version joined by horizontal separators.
fn description_block(ctx: &RenderContext<'_>, description: &str) -> Element {
    let heading = ctx.label.map_or_else(|| ctx.name.to_uppercase(), ToString::to_string);
    let text =
        [heading.as_str(), description, ctx.version].join(DESCRIPTION_SEPARATOR);

    let mut content = Element::new("content");
    content.children.push(XMLNode::Text(text));
    let mut label = Element::new("label");
    label.children.push(XMLNode::Element(content));
    let mut cell = Element::new("cell");
    cell.children.push(XMLNode::Element(label));
    let mut row = Element::new("row");
    row.children.push(XMLNode::Element(cell));
    let mut block = Element::new("block");
    block.children.push(XMLNode::Element(row));
    block
}

/// Structural sanity checks over a staged component set.
///
/// Findings are returned (and logged by [`validate_staged`]) but never block
/// a deployment: the validators are best-effort and an imperfect check must
/// not hold back a release. See DESIGN.md for the policy discussion.
pub fn validate_components(staging: &Path) -> Vec<String> {
    let mut findings = Vec::new();

    for component in WORKFLOW_COMPONENTS {
        let path = staging.join(component);
        if !path.is_file() {
            continue;
        }
        let doc = match Document::parse(&path) {
            Ok(doc) => doc,
            Err(e) => {
                findings.push(format!("{component}: not parseable after render: {e:#}"));
                continue;
            }
        };
        match component {
            "input.xml" | "result.xml" => {
                for attr in ["id", "version"] {
                    if !doc.root.attributes.contains_key(attr) {
                        findings.push(format!("{component}: missing '{attr}' attribute"));
                    }
                }
            }
            "flow.xml" => {
                if !doc.root.attributes.contains_key("name") {
                    findings.push("flow.xml: missing 'name' attribute".to_string());
                }
            }
            "tool.xml" => {
                if doc.path_set_bases().count() == 0 {
                    findings.push("tool.xml: no pathSet entries".to_string());
                }
                if doc.path_set_bases().any(|b| b.contains(BASE_PLACEHOLDER)) {
                    findings.push("tool.xml: unsubstituted $base placeholder".to_string());
                }
            }
            _ => {}
        }
    }

    findings
}

/// Runs [`validate_components`] and logs each finding as a warning.
pub fn validate_staged(staging: &Path) {
    for finding in validate_components(staging) {
        warn!("validation: {finding}");
    }
}
