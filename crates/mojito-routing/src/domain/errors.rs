//! Error types for the routing core.

use thiserror::Error;

/// Invariant violations and misuse of the route table.
///
/// Admission rejections are not errors; see [`crate::domain::AddOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("Invalid KUID: {0}")]
    InvalidKuid(String),

    #[error("Bucket ranges do not partition the id space: {reason}")]
    PartitionViolation { reason: String },
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
