//! Submission Requests and Responses
//!
//! A request carries the two named payloads a run needs: the workflow YAML
//! and the resource JSON. The boundary rejects a request missing either
//! payload before any content validation happens. Responses mirror the
//! JSON shape returned to callers: a success body or a single error.

use std::fs;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use super::submit::SubmissionOutcome;

/// Expected file name of the workflow payload in strict mode.
pub const WORKFLOW_FILE_NAME: &str = "workflow.yaml";

/// Expected file name of the resource payload in strict mode.
pub const RESOURCE_FILE_NAME: &str = "app_res.json";

/// Errors rejecting a request before the pipeline runs.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Both workflow and resource documents are required.")]
    MissingPayload,

    #[error("{kind} file must be named '{expected}'.")]
    UnexpectedName {
        kind: &'static str,
        expected: &'static str,
    },

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

/// One named document of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub file_name: String,
    pub content: String,
}

impl Payload {
    pub fn new(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    /// Reads a payload from disk, naming it after the file.
    pub fn from_path(path: &Path) -> Result<Self, RequestError> {
        let content = fs::read_to_string(path).map_err(|source| RequestError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self { file_name, content })
    }
}

/// The two documents of a pipeline run, either of which may be absent.
#[derive(Debug, Clone, Default)]
pub struct SubmissionRequest {
    pub workflow: Option<Payload>,
    pub resources: Option<Payload>,
}

impl SubmissionRequest {
    pub fn new(workflow: Option<Payload>, resources: Option<Payload>) -> Self {
        Self { workflow, resources }
    }

    /// Builds a request from optional file paths.
    pub fn from_paths(workflow: Option<&Path>, resources: Option<&Path>) -> Result<Self, RequestError> {
        Ok(Self {
            workflow: workflow.map(Payload::from_path).transpose()?,
            resources: resources.map(Payload::from_path).transpose()?,
        })
    }

    /// Returns both payloads, rejecting the request if either is absent.
    ///
    /// With `strict_names`, the payloads must be named
    /// [`WORKFLOW_FILE_NAME`] and [`RESOURCE_FILE_NAME`].
    pub fn payloads(&self, strict_names: bool) -> Result<(&Payload, &Payload), RequestError> {
        let (Some(workflow), Some(resources)) = (&self.workflow, &self.resources) else {
            return Err(RequestError::MissingPayload);
        };

        if strict_names {
            if workflow.file_name != WORKFLOW_FILE_NAME {
                return Err(RequestError::UnexpectedName {
                    kind: "YAML",
                    expected: WORKFLOW_FILE_NAME,
                });
            }
            if resources.file_name != RESOURCE_FILE_NAME {
                return Err(RequestError::UnexpectedName {
                    kind: "JSON",
                    expected: RESOURCE_FILE_NAME,
                });
            }
        }

        Ok((workflow, resources))
    }
}

/// Message returned when the external program accepted the workflow.
pub const SUBMITTED_MESSAGE: &str = "Workflow submitted successfully.";

/// Message returned when the external program rejected the workflow.
pub const REJECTED_MESSAGE: &str = "Workflow submission failed.";

/// Caller-visible result of a run.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum SubmissionResponse {
    Submitted {
        message: String,
        argo_output: String,
        argo_exit_code: Option<i32>,
        json_validation: String,
    },
    Failed {
        error: String,
    },
}

impl SubmissionResponse {
    /// Builds a response from the external program's outcome.
    pub fn from_outcome(outcome: &SubmissionOutcome, validation_message: &str) -> Self {
        let message = if outcome.success {
            SUBMITTED_MESSAGE
        } else {
            REJECTED_MESSAGE
        };

        Self::Submitted {
            message: message.to_string(),
            argo_output: outcome.output().to_string(),
            argo_exit_code: outcome.exit_code,
            json_validation: validation_message.to_string(),
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self::Failed {
            error: error.to_string(),
        }
    }

    /// True only when the external program accepted the workflow.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Submitted { message, .. } if message == SUBMITTED_MESSAGE)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self)
            .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
    }
}
