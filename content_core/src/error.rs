//! Error types for loading, committing and persisting content state.
//!
//! Load-time errors are recovered where they occur: a bad file or node is
//! logged and skipped, never fatal to the catalog. Selection itself never
//! fails; "nothing eligible" is an ordinary `None`.

use std::path::PathBuf;

use crate::trigger::TriggerParseError;

/// A whole catalog file was rejected.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed TOML in {origin}: {source}")]
    Toml {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("{origin}: unsupported schema version {found} (supported: {supported})")]
    UnsupportedSchema {
        origin: String,
        found: i64,
        supported: u32,
    },

    #[error("{origin}: missing schema_version")]
    MissingSchemaVersion { origin: String },

    #[error("{origin}: {reason}")]
    Malformed { origin: String, reason: String },

    #[error("{path}: unsupported catalog file extension")]
    UnsupportedFormat { path: PathBuf },
}

/// A single node failed validation and was skipped.
#[derive(Debug, thiserror::Error)]
pub enum NodeValidationError {
    #[error("node could not be decoded: {0}")]
    Decode(String),

    #[error("node id is empty")]
    EmptyId,

    #[error("node '{id}': weight {weight} must be finite and non-negative")]
    InvalidWeight { id: String, weight: f64 },

    #[error("node '{id}': range for '{attribute}' has min {min} > max {max}")]
    MalformedRange {
        id: String,
        attribute: String,
        min: i64,
        max: i64,
    },

    #[error("node '{id}': predicate '{attribute}' has unsupported value: {reason}")]
    BadPredicateValue {
        id: String,
        attribute: String,
        reason: String,
    },

    #[error("node '{id}': {source}")]
    UnrecognizedToken {
        id: String,
        #[source]
        source: TriggerParseError,
    },
}

/// Two nodes in one group carry identical predicate sets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("group '{group}': node '{id}' duplicates the predicates of an earlier variant")]
pub struct AmbiguousVariantError {
    pub group: String,
    pub id: String,
}

/// `commit` refused to record a firing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitError {
    #[error("pacing limit reached; '{id}' was not recorded")]
    PacingExhausted { id: String },
}

/// Saved state did not have the expected flat shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PersistError {
    #[error("{what}: count is {count} but {field} has {actual} entries")]
    LengthMismatch {
        what: &'static str,
        field: &'static str,
        count: usize,
        actual: usize,
    },

    #[error("{what}: {field} is negative ({value})")]
    Negative {
        what: &'static str,
        field: &'static str,
        value: i64,
    },

    #[error("saved state version {found} is not supported (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("saved state could not be decoded: {0}")]
    Decode(String),
}

/// The engine configuration could not be read.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
