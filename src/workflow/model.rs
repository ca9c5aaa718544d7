//! Workflow Data Model
//!
//! Typed view over an Argo-style workflow definition. Only the parts the
//! placement pipeline reads or writes are modelled explicitly; every other
//! key is carried through untouched in a flattened passthrough map so that
//! serializing the annotated workflow reproduces the rest of the document.
//!
//! # Example YAML Format
//!
//! ```yaml
//! apiVersion: argoproj.io/v1alpha1
//! kind: Workflow
//! metadata:
//!   generateName: pipeline-
//! spec:
//!   entrypoint: main
//!   templates:
//!     - name: main
//!       steps:
//!         - - name: fetch
//!             template: fetch-tmpl
//!         - - name: train
//!             template: train-tmpl
//!     - name: fetch-tmpl
//!       container:
//!         image: alpine:3.19
//!     - name: train-tmpl
//!       container:
//!         image: python:3.12
//! ```

use std::collections::BTreeMap;

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};

/// A parsed workflow definition.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WorkflowDefinition {
    /// Top-level keys other than `spec` (apiVersion, kind, metadata, ...)
    #[serde(flatten)]
    pub header: Mapping,

    #[serde(default, skip_serializing_if = "WorkflowSpec::is_empty")]
    pub spec: WorkflowSpec,
}

/// The `spec` section of a workflow.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WorkflowSpec {
    /// Keys other than `templates` (entrypoint, arguments, ...)
    #[serde(flatten)]
    pub extra: Mapping,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub templates: Vec<Template>,
}

impl WorkflowSpec {
    fn is_empty(&self) -> bool {
        self.extra.is_empty() && self.templates.is_empty()
    }
}

/// A workflow template.
///
/// A template with a `steps` key is a step-group template; anything else is
/// treated as a directly executable leaf.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Template {
    StepGroup(StepGroupTemplate),
    Leaf(LeafTemplate),
}

impl<'de> Deserialize<'de> for Template {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields = Mapping::deserialize(deserializer)?;
        let is_step_group = fields.contains_key("steps");
        let value = Value::Mapping(fields);

        if is_step_group {
            serde_yaml::from_value(value)
                .map(Self::StepGroup)
                .map_err(de::Error::custom)
        } else {
            serde_yaml::from_value(value)
                .map(Self::Leaf)
                .map_err(de::Error::custom)
        }
    }
}

impl Template {
    /// Returns the template name, if declared.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::StepGroup(group) => group.name.as_deref(),
            Self::Leaf(leaf) => leaf.name.as_deref(),
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafTemplate> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::StepGroup(_) => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafTemplate> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            Self::StepGroup(_) => None,
        }
    }
}

/// An executable template that may be pinned to a node type.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LeafTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Everything else on the template (container, script, inputs, ...)
    #[serde(flatten)]
    pub extra: Mapping,

    /// Node affinity written by the placement annotator
    #[serde(
        rename = "nodeSelector",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub node_selector: Option<BTreeMap<String, String>>,
}

impl LeafTemplate {
    /// Creates a leaf template with the given name and no other fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Sets a container image, mainly useful when building workflows in code.
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        let image: String = image.into();
        let mut container = Mapping::new();
        container.insert(Value::from("image"), Value::from(image));
        self.extra
            .insert(Value::from("container"), Value::Mapping(container));
        self
    }
}

/// A template that groups step references into sequential stages.
///
/// Each inner list is one stage; references inside a stage run in parallel.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StepGroupTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub steps: Vec<StepStage>,

    #[serde(flatten)]
    pub extra: Mapping,
}

impl StepGroupTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Appends a stage of step references.
    pub fn with_group(mut self, group: Vec<StepRef>) -> Self {
        self.steps
            .push(StepStage::Entries(group.into_iter().map(StepEntry::Ref).collect()));
        self
    }

    /// Iterates over every step reference in stage order, then reference order.
    ///
    /// Stages that are not lists and entries that are not mappings are skipped.
    pub fn step_refs(&self) -> impl Iterator<Item = &StepRef> {
        self.steps
            .iter()
            .filter_map(StepStage::entries)
            .flatten()
            .filter_map(StepEntry::as_step_ref)
    }
}

/// One stage of a step-group template.
///
/// A stage that is not a list is kept verbatim and contributes no steps.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum StepStage {
    Entries(Vec<StepEntry>),
    Other(Value),
}

impl StepStage {
    pub fn entries(&self) -> Option<&[StepEntry]> {
        match self {
            Self::Entries(entries) => Some(entries),
            Self::Other(_) => None,
        }
    }
}

/// One entry of a stage: a step reference, or anything else kept verbatim.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum StepEntry {
    Ref(StepRef),
    Other(Value),
}

impl StepEntry {
    pub fn as_step_ref(&self) -> Option<&StepRef> {
        match self {
            Self::Ref(step) => Some(step),
            Self::Other(_) => None,
        }
    }
}

/// An invocation of a template from inside a step group.
///
/// `name` and `template` are only read when they are strings; other values
/// stay in `extra` and are written back unchanged.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct StepRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Name of the template this step runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    #[serde(flatten)]
    pub extra: Mapping,
}

impl StepRef {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            template: Some(template.into()),
            extra: Mapping::new(),
        }
    }
}

impl<'de> Deserialize<'de> for StepRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut extra = Mapping::deserialize(deserializer)?;
        let name = take_string(&mut extra, "name");
        let template = take_string(&mut extra, "template");

        Ok(Self { name, template, extra })
    }
}

/// Removes `key` from the mapping if its value is a string.
fn take_string(fields: &mut Mapping, key: &str) -> Option<String> {
    if !matches!(fields.get(key), Some(Value::String(_))) {
        return None;
    }
    match fields.remove(key) {
        Some(Value::String(value)) => Some(value),
        _ => None,
    }
}

impl WorkflowDefinition {
    /// Creates a workflow with the given templates and no header fields.
    pub fn from_templates(templates: Vec<Template>) -> Self {
        Self {
            header: Mapping::new(),
            spec: WorkflowSpec {
                extra: Mapping::new(),
                templates,
            },
        }
    }

    pub fn templates(&self) -> &[Template] {
        &self.spec.templates
    }

    /// Iterates over the step-group templates in document order.
    pub fn step_groups(&self) -> impl Iterator<Item = &StepGroupTemplate> {
        self.spec.templates.iter().filter_map(|template| match template {
            Template::StepGroup(group) => Some(group),
            Template::Leaf(_) => None,
        })
    }

    /// Iterates over every step reference of every step-group template.
    pub fn step_refs(&self) -> impl Iterator<Item = &StepRef> {
        self.step_groups().flat_map(|group| group.step_refs())
    }

    /// Returns the declared step names in document order, duplicates included.
    ///
    /// References without a `name` are skipped.
    pub fn step_names(&self) -> Vec<String> {
        self.step_refs()
            .filter_map(|step| step.name.clone())
            .collect()
    }

    /// Looks up a leaf template by name.
    pub fn leaf(&self, name: &str) -> Option<&LeafTemplate> {
        self.spec
            .templates
            .iter()
            .filter_map(Template::as_leaf)
            .find(|leaf| leaf.name.as_deref() == Some(name))
    }

    pub fn is_empty(&self) -> bool {
        self.spec.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WorkflowDefinition {
        WorkflowDefinition::from_templates(vec![
            Template::StepGroup(
                StepGroupTemplate::new("main")
                    .with_group(vec![StepRef::new("fetch", "fetch-tmpl")])
                    .with_group(vec![
                        StepRef::new("train", "train-tmpl"),
                        StepRef::new("eval", "train-tmpl"),
                    ]),
            ),
            Template::Leaf(LeafTemplate::new("fetch-tmpl").with_image("alpine")),
            Template::Leaf(LeafTemplate::new("train-tmpl")),
        ])
    }

    #[test]
    fn test_step_names_in_document_order() {
        assert_eq!(sample().step_names(), vec!["fetch", "train", "eval"]);
    }

    #[test]
    fn test_step_names_skip_unnamed() {
        let workflow = WorkflowDefinition::from_templates(vec![Template::StepGroup(
            StepGroupTemplate::new("main").with_group(vec![
                StepRef {
                    name: None,
                    template: Some("t".to_string()),
                    extra: Mapping::new(),
                },
                StepRef::new("named", "t"),
            ]),
        )]);

        assert_eq!(workflow.step_names(), vec!["named"]);
    }

    #[test]
    fn test_leaf_lookup() {
        let workflow = sample();
        assert!(workflow.leaf("fetch-tmpl").is_some());
        assert!(workflow.leaf("main").is_none());
        assert!(workflow.leaf("missing").is_none());
    }

    #[test]
    fn test_template_name() {
        let workflow = sample();
        let names: Vec<_> = workflow.templates().iter().filter_map(Template::name).collect();
        assert_eq!(names, vec!["main", "fetch-tmpl", "train-tmpl"]);
    }

    #[test]
    fn test_deserialize_distinguishes_variants() {
        let yaml = r#"
spec:
  templates:
    - name: main
      steps:
        - - name: a
            template: leaf
    - name: leaf
      container:
        image: alpine
"#;
        let workflow: WorkflowDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(workflow.templates()[0], Template::StepGroup(_)));
        assert!(matches!(workflow.templates()[1], Template::Leaf(_)));

        let leaf = workflow.leaf("leaf").unwrap();
        assert!(leaf.extra.contains_key("container"));
        assert!(leaf.node_selector.is_none());
    }

    #[test]
    fn test_header_fields_preserved() {
        let yaml = r#"
apiVersion: argoproj.io/v1alpha1
kind: Workflow
spec:
  entrypoint: main
  templates:
    - name: main
      container:
        image: alpine
"#;
        let workflow: WorkflowDefinition = serde_yaml::from_str(yaml).unwrap();
        let out = serde_yaml::to_string(&workflow).unwrap();

        assert!(out.contains("apiVersion: argoproj.io/v1alpha1"));
        assert!(out.contains("kind: Workflow"));
        assert!(out.contains("entrypoint: main"));
        assert!(out.contains("image: alpine"));
        assert!(!out.contains("nodeSelector"));
    }

    #[test]
    fn test_malformed_step_entries_keep_good_siblings() {
        let yaml = r#"
spec:
  templates:
    - name: main
      steps:
        - - name: fetch
            template: fetch-tmpl
        - - name: 42
            template: fetch-tmpl
          - just-a-string
        - not-a-list
        - - name: train
            template: train-tmpl
    - name: fetch-tmpl
      container:
        image: alpine
"#;
        let workflow: WorkflowDefinition = serde_yaml::from_str(yaml).unwrap();

        assert!(matches!(workflow.templates()[0], Template::StepGroup(_)));
        assert!(workflow.leaf("main").is_none());
        assert_eq!(workflow.step_names(), vec!["fetch", "train"]);
        assert_eq!(workflow.step_refs().count(), 3);
    }

    #[test]
    fn test_malformed_step_entries_written_back() {
        let yaml = r#"
spec:
  templates:
    - name: main
      steps:
        - - name: 42
            template: fetch-tmpl
          - just-a-string
        - not-a-list
"#;
        let workflow: WorkflowDefinition = serde_yaml::from_str(yaml).unwrap();
        let out = serde_yaml::to_string(&workflow).unwrap();
        let reparsed: WorkflowDefinition = serde_yaml::from_str(&out).unwrap();

        assert_eq!(reparsed, workflow);
        assert!(out.contains("name: 42"));
        assert!(out.contains("just-a-string"));
        assert!(out.contains("not-a-list"));
    }

    #[test]
    fn test_missing_spec_is_empty() {
        let workflow: WorkflowDefinition = serde_yaml::from_str("kind: Workflow").unwrap();
        assert!(workflow.is_empty());
        assert!(workflow.step_names().is_empty());
    }
}
