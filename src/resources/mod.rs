//! Resource Descriptor Module
//!
//! Parses and validates the resource-requirement document that accompanies
//! a workflow.
//!
//! - [`model`]: Resource records, node types and the requirement grammar
//! - [`validator`]: Schema, grammar and step-name checks

pub mod model;
pub mod validator;

pub use model::{NodeType, Requirement, ResourceRecord, REQUIRED_FIELDS};
pub use validator::{load_resources, parse_resources, validate_records, validate_resources, VALID_MESSAGE};
