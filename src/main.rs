//! Placeflow CLI Entry Point
//!
//! Validates a resource document against a workflow, annotates the workflow
//! with node selectors and submits it to Argo.
//!
//! # Usage
//!
//! ```bash
//! # Validate, annotate and submit
//! placeflow workflow.yaml app_res.json
//!
//! # Validate and print the annotated workflow without submitting
//! placeflow workflow.yaml app_res.json --dry-run
//!
//! # Keep a copy of the annotated workflow
//! placeflow workflow.yaml app_res.json --output annotated.yaml
//!
//! # Submit into a namespace with a custom argo binary
//! PLACEFLOW_ARGO_BIN=/opt/argo/bin/argo placeflow workflow.yaml app_res.json -n ml
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use log::{error, info};

use placeflow::execution::{submit_workflow, SubmissionRequest, SubmissionResponse, SubmitConfig};
use placeflow::placement::PlacementOutcome;
use placeflow::workflow::save_workflow;
use placeflow::{run_pipeline, APP_NAME, VERSION};

/// Exit code for rejected requests and failed validation.
const EXIT_INVALID_INPUT: u8 = 2;

/// Output format of the final response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

/// Command-line configuration.
#[derive(Debug, Parser)]
#[command(name = "placeflow", version, about = "Resource-aware Argo workflow placement")]
struct Cli {
    /// Path to the workflow YAML file
    #[arg(value_name = "WORKFLOW_FILE")]
    workflow: Option<PathBuf>,

    /// Path to the resource JSON file
    #[arg(value_name = "RESOURCE_FILE")]
    resources: Option<PathBuf>,

    /// Submission program
    #[arg(long, env = "PLACEFLOW_ARGO_BIN", default_value = "argo")]
    argo_bin: String,

    /// Seconds to wait for the submission program
    #[arg(long, env = "PLACEFLOW_SUBMIT_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Namespace to submit into
    #[arg(short = 'n', long, env = "PLACEFLOW_NAMESPACE")]
    namespace: Option<String>,

    /// Validate and annotate only; print the annotated workflow
    #[arg(long)]
    dry_run: bool,

    /// Also write the annotated workflow to this path (JSON for .json paths)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Require the files to be named workflow.yaml and app_res.json
    #[arg(long)]
    strict_names: bool,

    /// Response format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn submit_config(&self) -> SubmitConfig {
        SubmitConfig {
            program: self.argo_bin.clone(),
            namespace: self.namespace.clone(),
            timeout: Duration::from_secs(self.timeout),
            ..SubmitConfig::default()
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    eprintln!();
    eprintln!("{} v{}", APP_NAME.bold(), VERSION);
    eprintln!("Resource-Aware Workflow Placement");
    eprintln!();
}

/// Prints the final response in the requested format.
fn report(response: &SubmissionResponse, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", response.to_json()),
        OutputFormat::Text => match response {
            SubmissionResponse::Failed { error } => {
                eprintln!("{} {}", "Error:".red().bold(), error);
            }
            SubmissionResponse::Submitted {
                message,
                argo_output,
                argo_exit_code,
                json_validation,
            } => {
                let headline = if response.is_success() {
                    message.green().bold()
                } else {
                    message.red().bold()
                };
                println!("{}", headline);
                println!("Validation: {}", json_validation);
                if let Some(code) = argo_exit_code {
                    println!("Exit code: {}", code);
                }
                if !argo_output.trim().is_empty() {
                    println!();
                    println!("{}", argo_output.trim_end());
                }
            }
        },
    }
}

/// Prints a one-line summary per skipped step.
fn summarize_placement(outcomes: &[PlacementOutcome]) {
    let skipped = outcomes.iter().filter(|o| !o.is_applied()).count();
    if skipped > 0 {
        info!(
            "{} of {} named steps kept their original placement",
            skipped,
            outcomes.len()
        );
    }
}

/// Main application flow.
async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let request = match SubmissionRequest::from_paths(cli.workflow.as_deref(), cli.resources.as_deref()) {
        Ok(request) => request,
        Err(e) => {
            report(&SubmissionResponse::failed(&e), cli.format);
            return Ok(ExitCode::from(EXIT_INVALID_INPUT));
        }
    };

    let (workflow, resources) = match request.payloads(cli.strict_names) {
        Ok(payloads) => payloads,
        Err(e) => {
            error!("{}", e);
            report(&SubmissionResponse::failed(&e), cli.format);
            return Ok(ExitCode::from(EXIT_INVALID_INPUT));
        }
    };

    info!("Workflow: {}", workflow.file_name);
    info!("Resources: {}", resources.file_name);

    let output = match run_pipeline(&workflow.content, &resources.content) {
        Ok(output) => output,
        Err(e) => {
            error!("{}", e);
            report(&SubmissionResponse::failed(&e), cli.format);
            return Ok(ExitCode::from(EXIT_INVALID_INPUT));
        }
    };

    summarize_placement(&output.outcomes);

    if let Some(path) = &cli.output {
        save_workflow(&output.workflow, &path.to_string_lossy())?;
    }

    if cli.dry_run {
        info!("Mode: DRY RUN (workflow will not be submitted)");
        print!("{}", output.to_yaml()?);
        return Ok(ExitCode::SUCCESS);
    }

    let response = match submit_workflow(&output.workflow, &cli.submit_config()).await {
        Ok(outcome) => SubmissionResponse::from_outcome(&outcome, &output.validation_message),
        Err(e) => SubmissionResponse::failed(&e),
    };

    report(&response, cli.format);

    if response.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    print_banner();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["placeflow", "workflow.yaml", "app_res.json"]).unwrap();

        assert_eq!(cli.workflow, Some(PathBuf::from("workflow.yaml")));
        assert_eq!(cli.resources, Some(PathBuf::from("app_res.json")));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(!cli.dry_run);
        assert!(!cli.strict_names);
    }

    #[test]
    fn test_cli_payloads_optional() {
        let cli = Cli::try_parse_from(["placeflow", "workflow.yaml"]).unwrap();
        assert!(cli.resources.is_none());
    }

    #[test]
    fn test_submit_config_from_cli() {
        let cli = Cli::try_parse_from([
            "placeflow",
            "w.yaml",
            "r.json",
            "--argo-bin",
            "/usr/local/bin/argo",
            "--timeout",
            "30",
            "-n",
            "ml",
        ])
        .unwrap();

        let config = cli.submit_config();
        assert_eq!(config.program, "/usr/local/bin/argo");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.namespace.as_deref(), Some("ml"));
        assert_eq!(config.args, vec!["submit"]);
    }

    #[test]
    fn test_cli_text_format() {
        let cli = Cli::try_parse_from(["placeflow", "--format", "text", "--dry-run"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(cli.dry_run);
    }
}
