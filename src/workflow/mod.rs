//! Workflow Definition Module
//!
//! Provides the typed workflow tree and the parsing utilities that feed the
//! placement pipeline.
//!
//! # Structure
//!
//! - [`model`]: Typed templates (leaf and step-group) and step references
//! - [`parser`]: YAML parsing, step-name extraction and YAML/JSON serialization

pub mod model;
pub mod parser;

pub use model::{
    LeafTemplate, StepEntry, StepGroupTemplate, StepRef, StepStage, Template, WorkflowDefinition,
};
pub use parser::{
    extract_step_names, load_workflow, parse_workflow, save_workflow, to_json, to_yaml,
};
