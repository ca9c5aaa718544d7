//! Resource Document Validation
//!
//! Validates a resource document against the fixed eight-field schema, the
//! value grammar of each field, and the step names declared by the
//! workflow. Checks run in three tiers and the first tier with findings
//! decides the error:
//!
//! 1. Missing fields ([`PipelineError::MissingField`])
//! 2. Invalid field values ([`PipelineError::InvalidField`])
//! 3. Unknown entity identifiers ([`PipelineError::InvalidIdentifier`])
//!
//! Findings are aggregated across all records without naming the record;
//! per-record attribution is logged at debug level.

use std::collections::HashSet;
use std::error::Error;
use std::fs;

use log::{debug, info};

use super::model::{
    display_value, NodeType, Requirement, ResourceRecord, ENTITY_UID, NODE_TYPE, REQUIRED_FIELDS,
};
use crate::error::{PipelineError, Result};

/// Message reported when a resource document passes every check.
pub const VALID_MESSAGE: &str = "Resource document is valid";

/// Parses resource JSON text into records.
///
/// The document must be a JSON array of JSON objects.
pub fn parse_resources(json_content: &str) -> Result<Vec<ResourceRecord>> {
    let records: Vec<ResourceRecord> =
        serde_json::from_str(json_content).map_err(PipelineError::resource_parse)?;

    debug!("Parsed {} resource records", records.len());
    Ok(records)
}

/// Loads and parses resource records from a JSON file.
///
/// Records are not validated; see [`validate_records`].
pub fn load_resources(path: &str) -> std::result::Result<Vec<ResourceRecord>, Box<dyn Error>> {
    info!("Loading resources from: {}", path);

    let json_content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read resource file '{}': {}", path, e))?;

    Ok(parse_resources(&json_content)?)
}

/// Parses and validates a resource document against the given step names.
///
/// On success the records are returned exactly as parsed.
///
/// # Example
///
/// ```
/// use placeflow::resources::validate_resources;
///
/// let json = r#"[{
///     "Software Entity UID": "fetch",
///     "Total Energy Consumption": "LOW",
///     "Total Execution Time": "<30",
///     "node type": "server",
///     "node CPU cores": ">2",
///     "node memory size": "HIGH",
///     "node persistent storage size": "indifferent",
///     "node network bandwidth upload": "=100"
/// }]"#;
///
/// let records = validate_resources(json, &["fetch".to_string()]).unwrap();
/// assert_eq!(records.len(), 1);
/// ```
pub fn validate_resources(json_content: &str, step_names: &[String]) -> Result<Vec<ResourceRecord>> {
    let records = parse_resources(json_content)?;
    validate_records(&records, step_names)?;
    Ok(records)
}

/// Validates already-parsed records against the given step names.
pub fn validate_records(records: &[ResourceRecord], step_names: &[String]) -> Result<()> {
    let known_steps: HashSet<&str> = step_names.iter().map(String::as_str).collect();

    let mut findings = Findings::default();
    for (index, record) in records.iter().enumerate() {
        findings.inspect(index, record, &known_steps);
    }

    findings.into_result()?;

    info!("Validated {} resource records", records.len());
    Ok(())
}

/// Accumulated validation findings across all records.
#[derive(Debug, Default)]
struct Findings {
    missing_fields: Vec<String>,
    invalid_fields: Vec<String>,
    invalid_uids: Vec<String>,
}

impl Findings {
    fn inspect(&mut self, index: usize, record: &ResourceRecord, known_steps: &HashSet<&str>) {
        for field in record.missing_fields() {
            debug!("Record {}: missing field '{}'", index, field);
            self.missing_fields.push(field.to_string());
        }

        for (field, value) in REQUIRED_FIELDS
            .iter()
            .filter_map(|field| record.get(field).map(|value| (*field, value)))
        {
            let text = value.as_str();

            match field {
                ENTITY_UID => {
                    if !text.is_some_and(|uid| known_steps.contains(uid)) {
                        debug!("Record {}: unknown entity '{}'", index, display_value(value));
                        self.invalid_uids.push(display_value(value));
                    }
                }
                NODE_TYPE => {
                    if !text.is_some_and(|node_type| node_type.parse::<NodeType>().is_ok()) {
                        debug!("Record {}: invalid node type '{}'", index, display_value(value));
                        self.invalid_fields
                            .push(format!("{}: {}", field, display_value(value)));
                    }
                }
                _ => {
                    if !text.is_some_and(|raw| raw.parse::<Requirement>().is_ok()) {
                        debug!("Record {}: invalid value for '{}'", index, field);
                        self.invalid_fields
                            .push(format!("{}: {}", field, display_value(value)));
                    }
                }
            }
        }
    }

    fn into_result(self) -> Result<()> {
        if !self.missing_fields.is_empty() {
            return Err(PipelineError::MissingField(self.missing_fields));
        }
        if !self.invalid_fields.is_empty() {
            return Err(PipelineError::InvalidField(self.invalid_fields));
        }
        if !self.invalid_uids.is_empty() {
            return Err(PipelineError::InvalidIdentifier(self.invalid_uids));
        }
        Ok(())
    }
}
