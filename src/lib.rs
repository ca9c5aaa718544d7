//! Placeflow - Resource-Aware Workflow Placement
//!
//! Validates a resource-requirement document against the steps declared in
//! an Argo workflow, then pins each step's template to the node type its
//! resource profile asks for before handing the workflow to `argo submit`.
//!
//! # Architecture
//!
//! The library is organized into five main modules:
//!
//! - [`workflow`]: Typed workflow tree, YAML parsing and step-name extraction
//! - [`resources`]: Resource records, value grammar and validation
//! - [`placement`]: Node-selector annotation of leaf templates
//! - [`pipeline`]: The extract, validate, annotate sequence
//! - [`execution`]: Request checks and the handoff to the external program
//!
//! # Example
//!
//! ```rust,no_run
//! use placeflow::execution::{submit_workflow, SubmitConfig};
//! use placeflow::run_pipeline;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let workflow = std::fs::read_to_string("workflow.yaml")?;
//!     let resources = std::fs::read_to_string("app_res.json")?;
//!
//!     // Validate and annotate
//!     let output = run_pipeline(&workflow, &resources)?;
//!
//!     // Submit the annotated workflow
//!     let outcome = submit_workflow(&output.workflow, &SubmitConfig::default()).await?;
//!     println!("{}", outcome.output());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod execution;
pub mod pipeline;
pub mod placement;
pub mod resources;
pub mod workflow;

// Re-export commonly used types
pub use error::{PipelineError, Result};
pub use pipeline::{run_pipeline, PipelineOutput};
pub use placement::PlacementAnnotator;
pub use resources::{validate_resources, ResourceRecord};
pub use workflow::{extract_step_names, WorkflowDefinition};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Placeflow";
