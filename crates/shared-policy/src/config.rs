//! # Policy Configuration
//!
//! Injectable vocabularies for the sensitivity scanner. The forbidden
//! vocabulary maps each pattern to a [`Severity`]; the allowed vocabulary
//! documents which public artifacts are expected to cross the boundary.
//!
//! Allowed tokens never suppress a forbidden match. A key named
//! `publicKeySecret` is still flagged for `secret`.
//!
//! The forbidden vocabulary keeps declaration order. Violations found at the
//! same node are reported in that order.

use std::collections::BTreeSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Default maximum nesting depth accepted by the scanner.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Forbidden patterns shipped with the edge-protection policy.
///
/// Spelling variants are listed explicitly; matching is case-insensitive,
/// so `PRIVATEKEY` is caught by `privateKey`.
pub const DEFAULT_FORBIDDEN: &[(&str, Severity)] = &[
    ("private_key", Severity::Critical),
    ("privateKey", Severity::Critical),
    ("private-key", Severity::Critical),
    ("secret", Severity::Critical),
    ("seed", Severity::High),
    ("mnemonic", Severity::Critical),
    ("entropy", Severity::High),
    ("priv_key", Severity::Critical),
    ("privKey", Severity::Critical),
    ("secretKey", Severity::Critical),
    ("secret_key", Severity::Critical),
];

/// Public artifacts that are expected in transmitted data.
pub const DEFAULT_ALLOWED: &[&str] = &[
    "public_key",
    "publicKey",
    "public-key",
    "signature",
    "aid",
    "prefix",
    "challenge",
    "token",
    "session",
    "timestamp",
    "nonce",
];

/// How bad a forbidden match is.
///
/// Severity is informational: any violation, whatever its severity, makes
/// the verdict unsafe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Could be derived-key material (entropy, seeds).
    High,
    /// Direct private key or secret material.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

// =============================================================================
// VOCABULARY
// =============================================================================

/// Ordered pattern → severity table.
///
/// Serialized as a JSON object; entries keep the order they were declared in.
/// Re-inserting a pattern changes its severity in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    entries: Vec<(String, Severity)>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `pattern`, or re-grade it if already present.
    pub fn insert(&mut self, pattern: impl Into<String>, severity: Severity) {
        let pattern = pattern.into();
        match self.entries.iter_mut().find(|(p, _)| *p == pattern) {
            Some(entry) => entry.1 = severity,
            None => self.entries.push((pattern, severity)),
        }
    }

    pub fn get(&self, pattern: &str) -> Option<Severity> {
        self.entries
            .iter()
            .find(|(p, _)| p == pattern)
            .map(|(_, severity)| *severity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Patterns in declaration order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.as_str())
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Severity)> {
        self.entries.iter().map(|(p, severity)| (p.as_str(), *severity))
    }
}

impl<P: Into<String>> FromIterator<(P, Severity)> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = (P, Severity)>>(iter: I) -> Self {
        let mut vocabulary = Self::new();
        for (pattern, severity) in iter {
            vocabulary.insert(pattern, severity);
        }
        vocabulary
    }
}

impl Serialize for Vocabulary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (pattern, severity) in &self.entries {
            map.serialize_entry(pattern, severity)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Vocabulary {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VocabularyVisitor;

        impl<'de> Visitor<'de> for VocabularyVisitor {
            type Value = Vocabulary;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of pattern to severity")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Vocabulary, A::Error> {
                let mut vocabulary = Vocabulary::new();
                while let Some((pattern, severity)) = access.next_entry::<String, Severity>()? {
                    vocabulary.insert(pattern, severity);
                }
                Ok(vocabulary)
            }
        }

        deserializer.deserialize_map(VocabularyVisitor)
    }
}

/// Errors in a policy configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolicyConfigError {
    /// An empty pattern would match every node
    #[error("forbidden pattern must not be empty")]
    EmptyPattern,

    /// The forbidden vocabulary has no entries
    #[error("forbidden vocabulary is empty")]
    EmptyVocabulary,

    /// An allowed token contains a forbidden pattern and could never pass
    #[error("allowed token {token:?} contains forbidden pattern {pattern:?}")]
    ContradictoryAllowedToken { token: String, pattern: String },

    /// Depth limit of zero rejects every document
    #[error("max_depth must be at least 1")]
    InvalidDepth,
}

/// Vocabulary and limits for the sensitivity scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Pattern → severity, in declaration order. Patterns keep their
    /// original spelling for reporting.
    pub forbidden: Vocabulary,
    /// Documented public tokens.
    pub allowed: BTreeSet<String>,
    /// Maximum nesting depth before a document is treated as malformed.
    pub max_depth: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::edge_protection()
    }
}

impl PolicyConfig {
    /// The default edge-protection vocabulary.
    pub fn edge_protection() -> Self {
        Self {
            forbidden: DEFAULT_FORBIDDEN
                .iter()
                .map(|(pattern, severity)| (*pattern, *severity))
                .collect(),
            allowed: DEFAULT_ALLOWED.iter().map(|t| t.to_string()).collect(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// A configuration with no vocabulary at all. Build it up with
    /// [`with_forbidden`](Self::with_forbidden) and
    /// [`with_allowed`](Self::with_allowed).
    pub fn empty() -> Self {
        Self {
            forbidden: Vocabulary::new(),
            allowed: BTreeSet::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Add (or re-grade) a forbidden pattern.
    pub fn with_forbidden(mut self, pattern: impl Into<String>, severity: Severity) -> Self {
        self.forbidden.insert(pattern.into(), severity);
        self
    }

    /// Add a documented public token.
    pub fn with_allowed(mut self, token: impl Into<String>) -> Self {
        self.allowed.insert(token.into());
        self
    }

    /// Override the nesting depth limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Whether `token` is part of the documented public vocabulary
    /// (case-insensitive).
    pub fn is_allowed(&self, token: &str) -> bool {
        self.allowed
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(token))
    }

    /// Validate the vocabulary.
    pub fn validate(&self) -> Result<(), PolicyConfigError> {
        if self.max_depth == 0 {
            return Err(PolicyConfigError::InvalidDepth);
        }
        if self.forbidden.is_empty() {
            return Err(PolicyConfigError::EmptyVocabulary);
        }
        if self.forbidden.patterns().any(|p| p.trim().is_empty()) {
            return Err(PolicyConfigError::EmptyPattern);
        }

        for token in &self.allowed {
            let lowered = token.to_lowercase();
            if let Some(pattern) = self
                .forbidden
                .patterns()
                .find(|p| lowered.contains(&p.to_lowercase()))
            {
                return Err(PolicyConfigError::ContradictoryAllowedToken {
                    token: token.clone(),
                    pattern: pattern.to_string(),
                });
            }
        }

        Ok(())
    }
}
