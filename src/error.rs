//! Pipeline Errors
//!
//! Every stage of the validation pipeline reports failure through
//! [`PipelineError`]. All variants are terminal for a run and carry
//! every offending item found, not just the first.

use std::fmt;

use thiserror::Error;

/// Which input document a parse failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    Workflow,
    Resources,
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workflow => write!(f, "workflow YAML"),
            Self::Resources => write!(f, "resource JSON"),
        }
    }
}

/// Errors raised while extracting, validating, or annotating.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Error parsing {document} file: {message}")]
    Parse { document: Document, message: String },

    #[error("Missing fields in resource document: {}", .0.join(", "))]
    MissingField(Vec<String>),

    #[error("Invalid field values in resource document: {}", .0.join(", "))]
    InvalidField(Vec<String>),

    #[error("Invalid Software Entity UID(s): {}", .0.join(", "))]
    InvalidIdentifier(Vec<String>),
}

impl PipelineError {
    pub(crate) fn workflow_parse(message: impl fmt::Display) -> Self {
        Self::Parse {
            document: Document::Workflow,
            message: message.to_string(),
        }
    }

    pub(crate) fn resource_parse(message: impl fmt::Display) -> Self {
        Self::Parse {
            document: Document::Resources,
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
