//! # Sensitivity Scanner
//!
//! Recursively visits every key and every scalar of a JSON document and
//! matches its text, case-insensitively, against the forbidden vocabulary.
//!
//! ```text
//! {"walletAddress": "my secret wallet"}
//!   key   "walletAddress"      -> no match
//!   value "my secret wallet"   -> `secret` at $.walletAddress (value)
//! ```
//!
//! One violation is recorded per (pattern, node, site). Violations are
//! ordered by traversal order, then by vocabulary order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{PolicyConfig, PolicyConfigError, Severity};
use crate::errors::{PolicyError, ScanFailure};

/// Root of every location path.
const ROOT: &str = "$";

/// Longest key rendered verbatim as a `.key` path segment.
const MAX_PLAIN_KEY: usize = 64;

/// Whether a pattern was found in a field name or in field content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSite {
    Key,
    Value,
}

/// A single forbidden match.
///
/// Never holds the matched text: `location` is the structural path of the
/// node (`$.outer.inner[2]`) and `pattern` is the vocabulary entry.
///
/// Identifier-like keys appear as `.key`. Other keys appear JSON-quoted as
/// `["a.b"]`, except that a free-form key which itself matched the
/// vocabulary is replaced by its position in the object, `[key#3]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub pattern: String,
    pub location: String,
    pub site: MatchSite,
    pub severity: Severity,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let site = match self.site {
            MatchSite::Key => "key",
            MatchSite::Value => "value",
        };
        write!(
            f,
            "`{}` in {} at {} ({})",
            self.pattern, site, self.location, self.severity
        )
    }
}

/// Result of a policy scan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitivityVerdict {
    /// True iff `violations` is empty.
    pub safe: bool,
    pub violations: Vec<Violation>,
}

impl SensitivityVerdict {
    fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            safe: violations.is_empty(),
            violations,
        }
    }

    /// Patterns that matched, in report order (may repeat).
    pub fn patterns(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.pattern.as_str()).collect()
    }

    /// Highest severity among the violations.
    pub fn max_severity(&self) -> Option<Severity> {
        self.violations.iter().map(|v| v.severity).max()
    }

    /// Convert an unsafe verdict into an error.
    pub fn into_result(self) -> Result<(), PolicyError> {
        if self.safe {
            Ok(())
        } else {
            Err(PolicyError::SensitivityViolation {
                violations: self.violations,
            })
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    original: String,
    lowered: String,
    severity: Severity,
}

/// Scanner over an injectable [`PolicyConfig`].
///
/// Pure: scanning never mutates its input and holds no state between calls,
/// so one scanner can be shared freely across threads.
#[derive(Debug, Clone)]
pub struct SensitivityScanner {
    config: PolicyConfig,
    patterns: Vec<CompiledPattern>,
}

impl Default for SensitivityScanner {
    fn default() -> Self {
        Self::edge_protection()
    }
}

impl SensitivityScanner {
    /// Create a scanner after validating `config`.
    pub fn new(config: PolicyConfig) -> Result<Self, PolicyConfigError> {
        config.validate()?;
        Ok(Self::compile(config))
    }

    /// Scanner over the default edge-protection vocabulary.
    pub fn edge_protection() -> Self {
        Self::compile(PolicyConfig::edge_protection())
    }

    fn compile(config: PolicyConfig) -> Self {
        let patterns = config
            .forbidden
            .iter()
            .map(|(pattern, severity)| CompiledPattern {
                original: pattern.to_string(),
                lowered: pattern.to_lowercase(),
                severity,
            })
            .collect();
        Self { config, patterns }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Scan any serializable value.
    pub fn scan<T: Serialize + ?Sized>(&self, data: &T) -> Result<SensitivityVerdict, ScanFailure> {
        let value =
            serde_json::to_value(data).map_err(|e| ScanFailure::Unserializable(e.to_string()))?;
        self.scan_value(&value)
    }

    /// Scan raw JSON bytes, e.g. an outbound request body right before it
    /// is transmitted.
    pub fn scan_json(&self, bytes: &[u8]) -> Result<SensitivityVerdict, ScanFailure> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| ScanFailure::MalformedJson(e.to_string()))?;
        self.scan_value(&value)
    }

    /// Scan an already-parsed JSON document.
    pub fn scan_value(&self, value: &Value) -> Result<SensitivityVerdict, ScanFailure> {
        let mut violations = Vec::new();
        let mut path = String::from(ROOT);
        self.walk(value, &mut path, 0, &mut violations)?;

        if !violations.is_empty() {
            tracing::debug!(
                count = violations.len(),
                "sensitivity scan found forbidden content"
            );
        }

        Ok(SensitivityVerdict::from_violations(violations))
    }

    /// Scan and fail on any violation.
    pub fn ensure_safe<T: Serialize + ?Sized>(&self, data: &T) -> Result<(), PolicyError> {
        self.scan(data)?.into_result()
    }

    fn walk(
        &self,
        value: &Value,
        path: &mut String,
        depth: usize,
        out: &mut Vec<Violation>,
    ) -> Result<(), ScanFailure> {
        if depth > self.config.max_depth {
            return Err(ScanFailure::DepthExceeded {
                max_depth: self.config.max_depth,
            });
        }

        match value {
            Value::Object(map) => {
                for (index, (key, child)) in map.iter().enumerate() {
                    let restore = path.len();
                    let hits = self.matching(key);
                    push_key_segment(path, key, index, !hits.is_empty());
                    record(&hits, path, MatchSite::Key, out);
                    self.walk(child, path, depth + 1, out)?;
                    path.truncate(restore);
                }
            }
            Value::Array(items) => {
                for (index, child) in items.iter().enumerate() {
                    let restore = path.len();
                    path.push_str(&format!("[{index}]"));
                    self.walk(child, path, depth + 1, out)?;
                    path.truncate(restore);
                }
            }
            Value::String(text) => self.match_text(text, path, MatchSite::Value, out),
            Value::Number(number) => {
                self.match_text(&number.to_string(), path, MatchSite::Value, out)
            }
            Value::Bool(flag) => self.match_text(&flag.to_string(), path, MatchSite::Value, out),
            Value::Null => {}
        }

        Ok(())
    }

    fn match_text(&self, text: &str, path: &str, site: MatchSite, out: &mut Vec<Violation>) {
        record(&self.matching(text), path, site, out);
    }

    /// Patterns found in `text`, in vocabulary order.
    fn matching(&self, text: &str) -> Vec<&CompiledPattern> {
        let lowered = text.to_lowercase();
        self.patterns
            .iter()
            .filter(|pattern| lowered.contains(&pattern.lowered))
            .collect()
    }
}

fn record(hits: &[&CompiledPattern], path: &str, site: MatchSite, out: &mut Vec<Violation>) {
    out.extend(hits.iter().map(|pattern| Violation {
        pattern: pattern.original.clone(),
        location: path.to_string(),
        site,
        severity: pattern.severity,
    }));
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= MAX_PLAIN_KEY
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn push_key_segment(path: &mut String, key: &str, index: usize, tripped: bool) {
    if is_plain_key(key) {
        path.push('.');
        path.push_str(key);
    } else if tripped {
        path.push_str(&format!("[key#{index}]"));
    } else {
        path.push('[');
        path.push_str(&Value::String(key.to_string()).to_string());
        path.push(']');
    }
}

// =============================================================================
// TESTS
// =============================================================================
