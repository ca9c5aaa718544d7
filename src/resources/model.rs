//! Resource Descriptor Data Model
//!
//! A resource document is a JSON array of records, one per workflow step,
//! describing the energy and time budget of the step and the node it needs.
//!
//! # Example JSON Format
//!
//! ```json
//! [
//!   {
//!     "Software Entity UID": "fetch",
//!     "Total Energy Consumption": "LOW",
//!     "Total Execution Time": "<30",
//!     "node type": "server",
//!     "node CPU cores": ">2",
//!     "node memory size": ">4",
//!     "node persistent storage size": "INDIFFERENT",
//!     "node network bandwidth upload": "HIGH"
//!   }
//! ]
//! ```
//!
//! Records are kept as their original JSON objects so that a validated
//! document can be handed on unchanged; typed views are derived on demand.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ENTITY_UID: &str = "Software Entity UID";
pub const TOTAL_ENERGY_CONSUMPTION: &str = "Total Energy Consumption";
pub const TOTAL_EXECUTION_TIME: &str = "Total Execution Time";
pub const NODE_TYPE: &str = "node type";
pub const NODE_CPU_CORES: &str = "node CPU cores";
pub const NODE_MEMORY_SIZE: &str = "node memory size";
pub const NODE_PERSISTENT_STORAGE_SIZE: &str = "node persistent storage size";
pub const NODE_NETWORK_BANDWIDTH_UPLOAD: &str = "node network bandwidth upload";

/// Fields every record must carry, in reporting order.
pub const REQUIRED_FIELDS: [&str; 8] = [
    ENTITY_UID,
    TOTAL_ENERGY_CONSUMPTION,
    TOTAL_EXECUTION_TIME,
    NODE_TYPE,
    NODE_CPU_CORES,
    NODE_MEMORY_SIZE,
    NODE_PERSISTENT_STORAGE_SIZE,
    NODE_NETWORK_BANDWIDTH_UPLOAD,
];

/// Fields whose values follow the [`Requirement`] grammar.
pub const MEASURED_FIELDS: [&str; 6] = [
    TOTAL_ENERGY_CONSUMPTION,
    TOTAL_EXECUTION_TIME,
    NODE_CPU_CORES,
    NODE_MEMORY_SIZE,
    NODE_PERSISTENT_STORAGE_SIZE,
    NODE_NETWORK_BANDWIDTH_UPLOAD,
];

/// Comparator immediately followed by a non-negative decimal number.
static COMPARISON_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([<>=])([0-9]+(?:\.[0-9]+)?)$").expect("valid comparison pattern"));

/// Kind of node a step must be placed on.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Server,
    EdgeDevice,
}

impl NodeType {
    pub const ALL: [NodeType; 2] = [NodeType::Server, NodeType::EdgeDevice];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::EdgeDevice => "edge_device",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    /// Parses a node type. Matching is case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|node_type| node_type.as_str() == s)
            .ok_or_else(|| format!("Unknown node type: '{}'", s))
    }
}

/// Qualitative requirement level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
    Indifferent,
}

/// Comparator of a numeric bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    LessThan,
    GreaterThan,
    Equal,
}

impl Comparator {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "<" => Some(Self::LessThan),
            ">" => Some(Self::GreaterThan),
            "=" => Some(Self::Equal),
            _ => None,
        }
    }
}

/// Value of a measured field: a qualitative level or a numeric bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Requirement {
    Level(Level),
    Bound { comparator: Comparator, value: f64 },
}

impl FromStr for Requirement {
    type Err = String;

    /// Parses `LOW`, `HIGH`, `INDIFFERENT` (any case) or `<N`, `>N`, `=N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LOW" => return Ok(Self::Level(Level::Low)),
            "HIGH" => return Ok(Self::Level(Level::High)),
            "INDIFFERENT" => return Ok(Self::Level(Level::Indifferent)),
            _ => {}
        }

        let invalid = || format!("Invalid requirement value: '{}'", s);
        let captures = COMPARISON_PATTERN.captures(s).ok_or_else(invalid)?;
        let comparator = Comparator::from_symbol(&captures[1]).ok_or_else(invalid)?;
        let value = captures[2].parse::<f64>().map_err(|_| invalid())?;

        Ok(Self::Bound { comparator, value })
    }
}

/// One entry of a resource document.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct ResourceRecord {
    fields: Map<String, Value>,
}

impl ResourceRecord {
    /// Creates a record with every required field set.
    ///
    /// Measured fields default to `INDIFFERENT`.
    pub fn new(uid: impl Into<String>, node_type: impl Into<String>) -> Self {
        let uid: String = uid.into();
        let node_type: String = node_type.into();
        let mut record = Self::default()
            .with_field(ENTITY_UID, uid)
            .with_field(NODE_TYPE, node_type);
        for field in MEASURED_FIELDS {
            record = record.with_field(field, "INDIFFERENT");
        }
        record
    }

    /// Sets a field to the given value.
    pub fn with_field(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// Removes a field.
    pub fn without_field(mut self, field: &str) -> Self {
        self.fields.remove(field);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// The step this record describes, if present and a string.
    pub fn entity_uid(&self) -> Option<&str> {
        self.fields.get(ENTITY_UID).and_then(Value::as_str)
    }

    /// The raw node type value, if present and a string.
    pub fn node_type(&self) -> Option<&str> {
        self.fields.get(NODE_TYPE).and_then(Value::as_str)
    }

    /// Parsed requirement of a measured field, if present and well-formed.
    pub fn requirement(&self, field: &str) -> Option<Requirement> {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .and_then(|value| value.parse().ok())
    }

    /// Required fields absent from this record, in schema order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        REQUIRED_FIELDS
            .into_iter()
            .filter(|field| !self.contains(field))
            .collect()
    }
}

/// Renders a JSON value for error messages: strings verbatim, others as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirement_levels_case_insensitive() {
        for value in ["LOW", "high", "Indifferent", "iNdIfFeReNt"] {
            assert!(value.parse::<Requirement>().is_ok(), "{} should parse", value);
        }
        assert_eq!(
            "high".parse::<Requirement>().unwrap(),
            Requirement::Level(Level::High)
        );
    }

    #[test]
    fn test_requirement_bounds_accepted() {
        assert_eq!(
            "<10".parse::<Requirement>().unwrap(),
            Requirement::Bound { comparator: Comparator::LessThan, value: 10.0 }
        );
        assert_eq!(
            ">3.5".parse::<Requirement>().unwrap(),
            Requirement::Bound { comparator: Comparator::GreaterThan, value: 3.5 }
        );
        assert_eq!(
            "=0".parse::<Requirement>().unwrap(),
            Requirement::Bound { comparator: Comparator::Equal, value: 0.0 }
        );
    }

    #[test]
    fn test_requirement_rejected() {
        for value in ["<=5", "10", "< 10", ">-1", ">1e3", " <10", "<10 ", "<10\n", ">.5", ">5.", "", "MEDIUM"] {
            assert!(value.parse::<Requirement>().is_err(), "{:?} should be rejected", value);
        }
    }

    #[test]
    fn test_node_type_case_sensitive() {
        assert_eq!("server".parse::<NodeType>().unwrap(), NodeType::Server);
        assert_eq!("edge_device".parse::<NodeType>().unwrap(), NodeType::EdgeDevice);
        assert!("Server".parse::<NodeType>().is_err());
        assert!("gpu".parse::<NodeType>().is_err());
        assert!("edge-device".parse::<NodeType>().is_err());
    }

    #[test]
    fn test_new_record_is_complete() {
        let record = ResourceRecord::new("fetch", "server");
        assert!(record.missing_fields().is_empty());
        assert_eq!(record.entity_uid(), Some("fetch"));
        assert_eq!(record.node_type(), Some("server"));
        assert_eq!(
            record.requirement(NODE_CPU_CORES),
            Some(Requirement::Level(Level::Indifferent))
        );
    }

    #[test]
    fn test_missing_fields_schema_order() {
        let record = ResourceRecord::new("fetch", "server")
            .without_field(NODE_MEMORY_SIZE)
            .without_field(ENTITY_UID);
        assert_eq!(record.missing_fields(), vec![ENTITY_UID, NODE_MEMORY_SIZE]);
    }

    #[test]
    fn test_record_deserializes_from_object() {
        let json = r#"{"Software Entity UID": "a", "extra": 3}"#;
        let record: ResourceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.entity_uid(), Some("a"));
        assert_eq!(record.get("extra"), Some(&Value::from(3)));
        assert_eq!(record.missing_fields().len(), 7);
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&Value::from("gpu")), "gpu");
        assert_eq!(display_value(&Value::from(4)), "4");
        assert_eq!(display_value(&Value::Null), "null");
    }
}
