//! Test utilities for wfdeploy
//!
//! Builders for on-disk workflow repository fixtures so unit and integration
//! tests can assemble realistic trees without repeating XML boilerplate.

use std::fs;
use std::path::{Path, PathBuf};

/// Builder for a single workflow directory inside a repository fixture.
///
/// Writes a `Makefile` plus whichever component documents the test asks for.
#[derive(Clone, Debug)]
pub struct WorkflowFixture {
    name: String,
    tool_name: Option<String>,
    version: Option<String>,
    label: Option<String>,
    description: Option<String>,
    dependencies: Vec<String>,
    components: Vec<&'static str>,
    tool_files: Vec<(String, String)>,
}

impl WorkflowFixture {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tool_name: None,
            version: None,
            label: None,
            description: None,
            dependencies: Vec::new(),
            components: Vec::new(),
            tool_files: Vec::new(),
        }
    }

    pub fn tool_name(mut self, tool_name: &str) -> Self {
        self.tool_name = Some(tool_name.to_string());
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Adds a pinned dependency declaration to the generated tool.xml,
    /// e.g. `"speclib/1.3"`.
    pub fn dependency(mut self, base: &str) -> Self {
        self.dependencies.push(base.to_string());
        self
    }

    /// Includes one of the standard component documents with minimal valid
    /// content for its kind.
    pub fn component(mut self, component: &'static str) -> Self {
        self.components.push(component);
        self
    }

    /// Adds a file to the workflow's `tools/<tool_name>/` bundle.
    pub fn tool_file(mut self, relative: &str, content: &str) -> Self {
        self.tool_files.push((relative.to_string(), content.to_string()));
        self
    }

    /// Writes the fixture under `repo_root` and returns the workflow directory.
    pub fn write(&self, repo_root: &Path) -> PathBuf {
        let dir = repo_root.join(&self.name);
        fs::create_dir_all(&dir).expect("create workflow dir");

        let mut makefile = format!("WORKFLOW_NAME={}\n", self.name);
        if let Some(tool_name) = &self.tool_name {
            makefile.push_str(&format!("TOOL_FOLDER_NAME={tool_name}\n"));
        }
        if let Some(version) = &self.version {
            makefile.push_str(&format!("WORKFLOW_VERSION={version}\n"));
        }
        if let Some(label) = &self.label {
            makefile.push_str(&format!("WORKFLOW_LABEL={label}\n"));
        }
        if let Some(description) = &self.description {
            makefile.push_str(&format!("WORKFLOW_DESCRIPTION={description}\n"));
        }
        makefile.push_str("deploy:\n\techo noop\n");
        fs::write(dir.join("Makefile"), makefile).expect("write Makefile");

        for component in &self.components {
            // tool.xml is generated below from the dependency list.
            if *component == "tool.xml" {
                continue;
            }
            fs::write(dir.join(component), component_content(component))
                .expect("write component");
        }

        if !self.dependencies.is_empty() || self.components.contains(&"tool.xml") {
            fs::write(dir.join("tool.xml"), self.tool_xml()).expect("write tool.xml");
        }

        if !self.tool_files.is_empty() {
            let tool_name = self.tool_name.as_deref().unwrap_or(&self.name);
            let bundle = dir.join("tools").join(tool_name);
            for (relative, content) in &self.tool_files {
                let path = bundle.join(relative);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).expect("create bundle dir");
                }
                fs::write(&path, content).expect("write tool file");
            }
        }

        dir
    }

    fn tool_xml(&self) -> String {
        let mut xml = String::from("<toolset>\n  <pathSet base=\"$base\">\n");
        xml.push_str("    <toolPath tool=\"main\" path=\"run.sh\"/>\n  </pathSet>\n");
        for dep in &self.dependencies {
            xml.push_str(&format!(
                "  <pathSet base=\"{dep}\">\n    <pathVar name=\"lib\" path=\".\"/>\n  </pathSet>\n"
            ));
        }
        xml.push_str("</toolset>\n");
        xml
    }
}

fn component_content(component: &str) -> &'static str {
    match component {
        "input.xml" => {
            r#"<interface id="placeholder" version="placeholder">
  <workflow name="PLACEHOLDER"/>
  <page id="form">
    <row><cell><label><content parameter="desc"/></label></cell></row>
  </page>
</interface>
"#
        }
        "result.xml" => {
            r#"<interface id="placeholder" version="placeholder">
  <download name="all"/>
</interface>
"#
        }
        "flow.xml" => {
            r#"<flow name="placeholder">
  <object name="spec"/>
  <action name="begin"/>
  <action name="end"/>
</flow>
"#
        }
        "binding.xml" => {
            r#"<binding>
  <bind action="begin" type="download"/>
</binding>
"#
        }
        other => panic!("no canned content for component {other}"),
    }
}

/// Writes a `wfdeploy.toml` in `dir` with local target roots under `dir`.
///
/// Returns the paths of the workflows root and tools root it configured.
pub fn write_local_config(dir: &Path, workflows: &[&str]) -> (PathBuf, PathBuf) {
    let workflows_root = dir.join("deployed-workflows");
    let tools_root = dir.join("deployed-tools");
    fs::create_dir_all(&workflows_root).expect("create workflows root");
    fs::create_dir_all(&tools_root).expect("create tools root");

    let fleet = workflows
        .iter()
        .map(|w| format!("\"{w}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let config = format!(
        r#"[target]
production_user = "wfprod"
workflows_root = "{}"
tools_root = "{}"

[repo]
root = "."
exclude = "deployment"

[fleet]
workflows = [{fleet}]
"#,
        workflows_root.display(),
        tools_root.display(),
    );
    fs::write(dir.join("wfdeploy.toml"), config).expect("write config");
    (workflows_root, tools_root)
}
