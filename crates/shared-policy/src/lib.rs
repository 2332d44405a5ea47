//! # Shared Sensitivity Policy
//!
//! Edge protection: private key material never leaves the device that holds
//! it. This crate classifies arbitrary structured data as safe or unsafe for
//! transmission by scanning every field name and every scalar against a
//! forbidden vocabulary.
//!
//! It is the leaf of the linking stack and has no knowledge of challenges or
//! payloads, so the same policy can run on the device (before a scan
//! response is sent) and on the server (before a payload is emitted and when
//! a response is received).
//!
//! ## Usage
//!
//! ```rust
//! use shared_policy::SensitivityScanner;
//! use serde_json::json;
//!
//! let scanner = SensitivityScanner::edge_protection();
//! let verdict = scanner.scan_value(&json!({"privateKey": "abc"})).unwrap();
//! assert!(!verdict.safe);
//! assert_eq!(verdict.violations[0].pattern, "privateKey");
//! ```
//!
//! ## Policy Rules
//!
//! - Matching is case-insensitive substring matching on keys and values
//! - Allowed tokens are documentation only; they never cancel a match
//! - Malformed input is a [`ScanFailure`], never a violation

pub mod config;
pub mod errors;
pub mod scanner;

pub use config::{
    PolicyConfig, PolicyConfigError, Severity, Vocabulary, DEFAULT_ALLOWED, DEFAULT_FORBIDDEN,
};
pub use errors::{PolicyError, ScanFailure};
pub use scanner::{MatchSite, SensitivityScanner, SensitivityVerdict, Violation};
