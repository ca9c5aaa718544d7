//! Placement Annotation
//!
//! Pins leaf templates to a node type by writing a `nodeSelector` derived
//! from the resource record of every step that invokes them.
//!
//! The two name-based joins (step name to resource record, step target to
//! leaf template) are resolved through lookup tables built once per run.
//! A step whose join fails is reported as an explicit [`PlacementOutcome`]
//! and otherwise left alone.

use std::collections::{BTreeMap, HashMap};

use log::{debug, info, warn};

use crate::resources::{NodeType, ResourceRecord};
use crate::workflow::WorkflowDefinition;

/// Label value written next to the node type key.
const SELECTOR_VALUE: &str = "true";

/// Node affinity attached to a leaf template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementConstraint {
    pub node_type: NodeType,
}

impl PlacementConstraint {
    pub fn new(node_type: NodeType) -> Self {
        Self { node_type }
    }

    /// The single-key `nodeSelector` map, e.g. `{"server": "true"}`.
    pub fn to_selector(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(self.node_type.as_str().to_string(), SELECTOR_VALUE.to_string())])
    }
}

/// What happened to one named step reference during annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// The target template was pinned to the record's node type.
    Applied {
        step: String,
        template: String,
        node_type: NodeType,
    },
    /// No resource record names this step.
    NoRecord { step: String },
    /// The matching record has no usable `node type`.
    MissingNodeType { step: String },
    /// The matching record names a node type that cannot be placed.
    UnsupportedNodeType { step: String, node_type: String },
    /// The step's `template` does not name a leaf template.
    UnresolvedTemplate { step: String, template: Option<String> },
}

impl PlacementOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Annotates workflows using a fixed set of resource records.
///
/// When several records share an entity identifier, the first one in
/// document order is used.
pub struct PlacementAnnotator<'a> {
    records: HashMap<&'a str, &'a ResourceRecord>,
}

impl<'a> PlacementAnnotator<'a> {
    pub fn new(records: &'a [ResourceRecord]) -> Self {
        let mut by_uid = HashMap::new();
        for record in records {
            if let Some(uid) = record.entity_uid() {
                by_uid.entry(uid).or_insert(record);
            }
        }

        Self { records: by_uid }
    }

    /// Writes placement constraints into the workflow's leaf templates.
    ///
    /// Step references are visited in template order, then stage order,
    /// then reference order. When several steps invoke the same leaf
    /// template, the last one visited decides its constraint.
    ///
    /// Returns one outcome per step reference with a non-empty name.
    pub fn annotate(&self, workflow: &mut WorkflowDefinition) -> Vec<PlacementOutcome> {
        let mut outcomes = Vec::new();
        let mut assignments: Vec<(usize, PlacementConstraint)> = Vec::new();

        {
            let mut leaves: HashMap<&str, Vec<usize>> = HashMap::new();
            for (position, template) in workflow.templates().iter().enumerate() {
                if let Some(name) = template.as_leaf().and_then(|leaf| leaf.name.as_deref()) {
                    leaves.entry(name).or_default().push(position);
                }
            }

            for step in workflow.step_refs() {
                let Some(step_name) = step.name.as_deref().filter(|name| !name.is_empty()) else {
                    continue;
                };

                let outcome = match self.constraint_for(step_name) {
                    Err(outcome) => outcome,
                    Ok(constraint) => match step
                        .template
                        .as_deref()
                        .and_then(|target| leaves.get(target).map(|positions| (target, positions)))
                    {
                        Some((target, positions)) => {
                            assignments.extend(positions.iter().map(|&position| (position, constraint)));
                            PlacementOutcome::Applied {
                                step: step_name.to_string(),
                                template: target.to_string(),
                                node_type: constraint.node_type,
                            }
                        }
                        None => PlacementOutcome::UnresolvedTemplate {
                            step: step_name.to_string(),
                            template: step.template.clone(),
                        },
                    },
                };

                log_outcome(&outcome);
                outcomes.push(outcome);
            }
        }

        for (position, constraint) in assignments {
            if let Some(leaf) = workflow.spec.templates[position].as_leaf_mut() {
                leaf.node_selector = Some(constraint.to_selector());
            }
        }

        let applied = outcomes.iter().filter(|o| o.is_applied()).count();
        info!(
            "Placement: {} of {} named steps pinned to a node type",
            applied,
            outcomes.len()
        );

        outcomes
    }

    fn constraint_for(&self, step_name: &str) -> Result<PlacementConstraint, PlacementOutcome> {
        let record = self.records.get(step_name).ok_or_else(|| PlacementOutcome::NoRecord {
            step: step_name.to_string(),
        })?;

        let raw = record.node_type().ok_or_else(|| PlacementOutcome::MissingNodeType {
            step: step_name.to_string(),
        })?;

        let node_type = raw
            .parse::<NodeType>()
            .map_err(|_| PlacementOutcome::UnsupportedNodeType {
                step: step_name.to_string(),
                node_type: raw.to_string(),
            })?;

        Ok(PlacementConstraint::new(node_type))
    }
}

fn log_outcome(outcome: &PlacementOutcome) {
    match outcome {
        PlacementOutcome::Applied { step, template, node_type } => {
            info!("Step '{}': template '{}' pinned to {}", step, template, node_type);
        }
        PlacementOutcome::NoRecord { step } => {
            warn!("Step '{}': no resource record, placement skipped", step);
        }
        PlacementOutcome::MissingNodeType { step } => {
            warn!("Step '{}': resource record has no node type, placement skipped", step);
        }
        PlacementOutcome::UnsupportedNodeType { step, node_type } => {
            warn!("Step '{}': unsupported node type '{}', placement skipped", step, node_type);
        }
        PlacementOutcome::UnresolvedTemplate { step, template } => match template {
            Some(name) => warn!("Step '{}': no leaf template named '{}', placement skipped", step, name),
            None => debug!("Step '{}': no template reference, placement skipped", step),
        },
    }
}

/// Annotates a workflow in place and returns it.
pub fn annotate_workflow(
    mut workflow: WorkflowDefinition,
    records: &[ResourceRecord],
) -> WorkflowDefinition {
    PlacementAnnotator::new(records).annotate(&mut workflow);
    workflow
}
