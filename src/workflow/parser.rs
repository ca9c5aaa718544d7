//! Workflow Parser
//!
//! Parses workflow YAML into a [`WorkflowDefinition`], extracts the declared
//! step names used to validate resource documents, and serializes the
//! annotated workflow back to YAML or JSON.

use std::error::Error;
use std::fs;

use log::{debug, info};

use super::model::WorkflowDefinition;
use crate::error::{PipelineError, Result};

/// Parses workflow YAML text.
///
/// Fails with [`PipelineError::Parse`] when the text is not well-formed
/// YAML or does not match the expected template structure.
pub fn parse_workflow(yaml_content: &str) -> Result<WorkflowDefinition> {
    debug!("Parsing workflow YAML ({} bytes)", yaml_content.len());

    let workflow: WorkflowDefinition =
        serde_yaml::from_str(yaml_content).map_err(PipelineError::workflow_parse)?;

    debug!("Parsed {} templates", workflow.templates().len());
    Ok(workflow)
}

/// Extracts the ordered list of step names declared in a workflow.
///
/// Walks every step-group template, every stage, and every step reference
/// in document order. References without a `name` are skipped; duplicate
/// names are kept.
///
/// # Example
///
/// ```
/// use placeflow::workflow::extract_step_names;
///
/// let yaml = r#"
/// spec:
///   templates:
///     - name: main
///       steps:
///         - - name: fetch
///             template: fetch-tmpl
///     - name: fetch-tmpl
///       container:
///         image: alpine
/// "#;
///
/// assert_eq!(extract_step_names(yaml).unwrap(), vec!["fetch"]);
/// ```
pub fn extract_step_names(yaml_content: &str) -> Result<Vec<String>> {
    let workflow = parse_workflow(yaml_content)?;
    let step_names = workflow.step_names();

    debug!("Extracted step names: {:?}", step_names);
    Ok(step_names)
}

/// Loads and parses a workflow from a YAML file.
///
/// # Arguments
///
/// * `path` - Path to the workflow YAML file
pub fn load_workflow(path: &str) -> std::result::Result<WorkflowDefinition, Box<dyn Error>> {
    info!("Loading workflow from: {}", path);

    let yaml_content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read workflow file '{}': {}", path, e))?;

    Ok(parse_workflow(&yaml_content)?)
}

/// Serializes a workflow to YAML text.
pub fn to_yaml(workflow: &WorkflowDefinition) -> std::result::Result<String, serde_yaml::Error> {
    serde_yaml::to_string(workflow)
}

/// Serializes a workflow to JSON text.
///
/// Every string is quoted, so words such as `on` or `yes` stay strings for
/// consumers that parse YAML 1.1.
pub fn to_json(workflow: &WorkflowDefinition) -> std::result::Result<String, serde_json::Error> {
    serde_json::to_string_pretty(workflow)
}

/// Saves a workflow to a file.
///
/// Paths ending in `.json` get JSON; anything else gets YAML.
///
/// # Arguments
///
/// * `workflow` - The workflow to save
/// * `path` - Output file path
pub fn save_workflow(workflow: &WorkflowDefinition, path: &str) -> std::result::Result<(), Box<dyn Error>> {
    let content = if path.ends_with(".json") {
        to_json(workflow)?
    } else {
        to_yaml(workflow)?
    };
    fs::write(path, content)
        .map_err(|e| format!("Failed to write workflow file '{}': {}", path, e))?;
    info!("Workflow saved to: {}", path);
    Ok(())
}
