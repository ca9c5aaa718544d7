//! Workflow Submission
//!
//! Hands an annotated workflow to the external workflow-execution program
//! (`argo submit` by default):
//! - Serializes the workflow to a temporary JSON file
//! - Runs the program with a timeout
//! - Captures stdout, stderr and exit status
//! - Removes the temporary file whatever the result

use std::io::Write;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::Serialize;
use thiserror::Error;
use tokio::process::Command;

use crate::workflow::{to_json, WorkflowDefinition};

/// Default program used to submit workflows.
pub const DEFAULT_PROGRAM: &str = "argo";

/// Default time allowed for the submission program to finish.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors raised while handing a workflow to the external program.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Failed to serialize annotated workflow: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write workflow for submission: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("'{program}' did not finish within {seconds}s")]
    Timeout { program: String, seconds: u64 },
}

/// How to invoke the submission program.
#[derive(Debug, Clone)]
pub struct SubmitConfig {
    /// Program to run
    pub program: String,

    /// Arguments placed before the workflow file path
    pub args: Vec<String>,

    /// Optional namespace passed as `-n <namespace>`
    pub namespace: Option<String>,

    pub timeout: Duration,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            args: vec!["submit".to_string()],
            namespace: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Result of running the submission program to completion.
#[derive(Serialize, Debug, Clone)]
pub struct SubmissionOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionOutcome {
    /// Stdout on success, stderr on failure.
    pub fn output(&self) -> &str {
        if self.success {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// Serializes and submits an annotated workflow.
///
/// The workflow is handed over as JSON so that every string value keeps its
/// type under the program's YAML 1.1 parser.
pub async fn submit_workflow(
    workflow: &WorkflowDefinition,
    config: &SubmitConfig,
) -> Result<SubmissionOutcome, SubmitError> {
    let json_content = to_json(workflow)?;
    submit_json(&json_content, config).await
}

/// Writes a workflow manifest to a temporary JSON file and submits it.
///
/// The temporary file is deleted when this function returns, including on
/// spawn failure and timeout.
pub async fn submit_json(
    json_content: &str,
    config: &SubmitConfig,
) -> Result<SubmissionOutcome, SubmitError> {
    let mut workflow_file = tempfile::Builder::new()
        .prefix("placeflow-")
        .suffix(".json")
        .tempfile()?;
    workflow_file.write_all(json_content.as_bytes())?;
    workflow_file.flush()?;

    debug!("Workflow written to {}", workflow_file.path().display());

    let mut cmd = Command::new(&config.program);
    cmd.args(&config.args);
    if let Some(namespace) = &config.namespace {
        cmd.arg("-n").arg(namespace);
    }
    cmd.arg(workflow_file.path()).kill_on_drop(true);

    info!("Submitting workflow with '{}'", config.program);
    let submitted_at = Utc::now();

    let output = match tokio::time::timeout(config.timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            error!("Failed to start '{}': {}", config.program, source);
            return Err(SubmitError::Spawn {
                program: config.program.clone(),
                source,
            });
        }
        Err(_) => {
            error!(
                "'{}' timed out after {}s",
                config.program,
                config.timeout.as_secs()
            );
            return Err(SubmitError::Timeout {
                program: config.program.clone(),
                seconds: config.timeout.as_secs(),
            });
        }
    };

    let outcome = SubmissionOutcome {
        success: output.status.success(),
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        submitted_at,
    };

    if !outcome.stdout.trim().is_empty() {
        info!("{} output:\n{}", config.program, outcome.stdout.trim_end());
    }
    if !outcome.stderr.trim().is_empty() {
        error!("{} error:\n{}", config.program, outcome.stderr.trim_end());
    }

    if outcome.success {
        info!("Submission completed");
    } else {
        error!("Submission failed with exit code: {:?}", outcome.exit_code);
    }

    Ok(outcome)
}
