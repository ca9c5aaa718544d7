//! Placement Module
//!
//! Derives node-placement constraints from validated resource records and
//! writes them into the workflow's leaf templates.

pub mod annotator;

pub use annotator::{annotate_workflow, PlacementAnnotator, PlacementConstraint, PlacementOutcome};
