//! Submission Boundary Module
//!
//! Everything between the pipeline and the outside world: request payload
//! checks, the handoff to the external workflow-execution program, and the
//! caller-visible response.
//!
//! - [`request`]: Request payloads and responses
//! - [`submit`]: Temporary-file handoff to `argo submit`

pub mod request;
pub mod submit;

pub use request::{Payload, RequestError, SubmissionRequest, SubmissionResponse};
pub use submit::{submit_json, submit_workflow, SubmissionOutcome, SubmitConfig, SubmitError};
