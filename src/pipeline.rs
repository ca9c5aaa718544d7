//! Validation and Placement Pipeline
//!
//! Runs the three stages in order on one pair of input documents:
//!
//! 1. Parse the workflow and extract its step names
//! 2. Validate the resource document against the schema and those names
//! 3. Annotate the workflow's leaf templates with node selectors
//!
//! Any error aborts the run before annotation; there is no partial result.

use log::{debug, info};

use crate::error::Result;
use crate::placement::{PlacementAnnotator, PlacementOutcome};
use crate::resources::{validate_resources, ResourceRecord, VALID_MESSAGE};
use crate::workflow::{parse_workflow, to_yaml, WorkflowDefinition};

/// Result of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// The workflow with placement constraints applied
    pub workflow: WorkflowDefinition,

    /// The validated resource records, unchanged
    pub records: Vec<ResourceRecord>,

    /// Per-step placement outcomes in traversal order
    pub outcomes: Vec<PlacementOutcome>,

    /// Human-readable validation result
    pub validation_message: String,
}

impl PipelineOutput {
    /// Serializes the annotated workflow to YAML.
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        to_yaml(&self.workflow)
    }
}

/// Validates the resource document against the workflow and annotates it.
///
/// # Example
///
/// ```
/// use placeflow::pipeline::run_pipeline;
///
/// let workflow = r#"
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
/// let resources = r#"[{
///     "Software Entity UID": "fetch",
///     "Total Energy Consumption": "LOW",
///     "Total Execution Time": ">2",
///     "node type": "server",
///     "node CPU cores": "LOW",
///     "node memory size": "LOW",
///     "node persistent storage size": "LOW",
///     "node network bandwidth upload": "LOW"
/// }]"#;
///
/// let output = run_pipeline(workflow, resources).unwrap();
/// let leaf = output.workflow.leaf("fetch-tmpl").unwrap();
/// assert_eq!(leaf.node_selector.as_ref().unwrap()["server"], "true");
/// ```
pub fn run_pipeline(workflow_yaml: &str, resources_json: &str) -> Result<PipelineOutput> {
    let mut workflow = parse_workflow(workflow_yaml)?;
    let step_names = workflow.step_names();
    info!("Extracted {} step names from workflow", step_names.len());
    debug!("Valid step names: {:?}", step_names);

    let records = validate_resources(resources_json, &step_names)?;
    info!("{}", VALID_MESSAGE);

    let outcomes = PlacementAnnotator::new(&records).annotate(&mut workflow);

    Ok(PipelineOutput {
        workflow,
        records,
        outcomes,
        validation_message: VALID_MESSAGE.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::error::PipelineError;
    use crate::resources::model::{NODE_CPU_CORES, TOTAL_EXECUTION_TIME};

    const WORKFLOW: &str = r#"
apiVersion: argoproj.io/v1alpha1
kind: Workflow
metadata:
  generateName: ml-pipeline-
spec:
  entrypoint: main
  templates:
    - name: main
      steps:
        - - name: fetch
            template: fetch-tmpl
        - - name: train
            template: train-tmpl
    - name: fetch-tmpl
      container:
        image: alpine:3.19
        command: [sh, -c, "echo fetching"]
    - name: train-tmpl
      container:
        image: python:3.12
"#;

    fn resources(records: &[ResourceRecord]) -> String {
        serde_json::to_string(records).unwrap()
    }

    fn selector(key: &str) -> Option<BTreeMap<String, String>> {
        Some(BTreeMap::from([(key.to_string(), "true".to_string())]))
    }

    #[test]
    fn test_end_to_end_annotation() {
        let records = vec![
            ResourceRecord::new("fetch", "server").with_field(TOTAL_EXECUTION_TIME, ">2"),
            ResourceRecord::new("train", "edge_device").with_field(NODE_CPU_CORES, "LOW"),
        ];

        let output = run_pipeline(WORKFLOW, &resources(&records)).unwrap();

        assert_eq!(output.validation_message, VALID_MESSAGE);
        assert_eq!(output.records, records);
        assert_eq!(
            output.workflow.leaf("fetch-tmpl").unwrap().node_selector,
            selector("server")
        );
        assert_eq!(
            output.workflow.leaf("train-tmpl").unwrap().node_selector,
            selector("edge_device")
        );
        assert!(output.outcomes.iter().all(PlacementOutcome::is_applied));
    }

    #[test]
    fn test_end_to_end_yaml_output() {
        let records = vec![
            ResourceRecord::new("fetch", "server"),
            ResourceRecord::new("train", "edge_device"),
        ];

        let output = run_pipeline(WORKFLOW, &resources(&records)).unwrap();
        let yaml = output.to_yaml().unwrap();
        let reparsed = parse_workflow(&yaml).unwrap();

        assert_eq!(reparsed, output.workflow);
        assert!(yaml.contains("nodeSelector"));
        assert!(yaml.contains("generateName: ml-pipeline-"));
        assert!(yaml.contains("image: alpine:3.19"));
    }

    #[test]
    fn test_missing_field_aborts_before_annotation() {
        let records = vec![
            ResourceRecord::new("fetch", "server").without_field(NODE_CPU_CORES),
            ResourceRecord::new("train", "edge_device"),
        ];

        match run_pipeline(WORKFLOW, &resources(&records)) {
            Err(PipelineError::MissingField(fields)) => assert_eq!(fields, vec!["node CPU cores"]),
            other => panic!("expected missing field error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_step_rejected() {
        let records = vec![ResourceRecord::new("deploy", "server")];

        let err = run_pipeline(WORKFLOW, &resources(&records)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidIdentifier(ref uids) if uids == &["deploy"]));
    }

    #[test]
    fn test_malformed_workflow_is_parse_error() {
        let err = run_pipeline("spec: [unclosed", "[]").unwrap_err();
        assert!(matches!(err, PipelineError::Parse { document: crate::error::Document::Workflow, .. }));
    }

    #[test]
    fn test_malformed_resources_is_parse_error() {
        let err = run_pipeline(WORKFLOW, "not json").unwrap_err();
        assert!(matches!(err, PipelineError::Parse { document: crate::error::Document::Resources, .. }));
    }
}
