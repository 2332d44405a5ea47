//! # Policy Errors
//!
//! A scan can fail in two distinct ways: the input could not be scanned at
//! all ([`ScanFailure`]), or it was scanned and contained forbidden content
//! ([`PolicyError::SensitivityViolation`]). Neither carries the offending
//! value, only pattern identifiers and structural locations.

use thiserror::Error;

use crate::config::PolicyConfigError;
use crate::scanner::Violation;

/// Input that could not be represented as a scannable document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanFailure {
    /// The value could not be serialized into a JSON document
    #[error("input is not serializable: {0}")]
    Unserializable(String),

    /// The bytes are not a JSON document
    #[error("input is not valid JSON: {0}")]
    MalformedJson(String),

    /// The document nests deeper than the configured limit
    #[error("input nests deeper than {max_depth} levels")]
    DepthExceeded { max_depth: usize },
}

/// Errors raised when enforcing the policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// The input could not be scanned
    #[error("scan failure: {0}")]
    ScanFailure(#[from] ScanFailure),

    /// Forbidden content detected
    #[error("sensitivity violation: {}", describe(.violations))]
    SensitivityViolation { violations: Vec<Violation> },

    /// The policy configuration is unusable
    #[error("invalid policy configuration: {0}")]
    Config(#[from] PolicyConfigError),
}

fn describe(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
