//! Linking configuration with validation.
//!
//! Values come from defaults, an optional JSON file loaded by the runtime,
//! and `EL_*` environment overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_policy::{PolicyConfig, PolicyConfigError};

/// Default challenge lifetime (10 minutes).
pub const DEFAULT_CHALLENGE_LIFETIME_MS: u64 = 10 * 60 * 1000;

/// Default transport ceiling for an encoded payload.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 2048;

pub const DEFAULT_PAYLOAD_VERSION: &str = "1.0";

pub const DEFAULT_PAYLOAD_TYPE: &str = "account-linking";

pub const DEFAULT_ENVIRONMENT: &str = "sandbox";

pub const DEFAULT_CALLBACK_LOCATION: &str = "https://link.example.org/callback";

/// Main linking configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkingConfig {
    /// Lifetime of each issued challenge, in milliseconds
    pub challenge_lifetime_ms: u64,
    /// Transport ceiling for encoded payloads, in bytes
    pub max_payload_bytes: usize,
    /// `version` field of emitted payloads
    pub payload_version: String,
    /// `type` discriminator of emitted payloads
    pub payload_type: String,
    /// Environment tag placed in payloads
    pub environment: String,
    /// URI the scanning device must contact
    pub callback_location: String,
    /// Sensitivity policy vocabulary and limits
    pub policy: PolicyConfig,
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            challenge_lifetime_ms: DEFAULT_CHALLENGE_LIFETIME_MS,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            payload_version: DEFAULT_PAYLOAD_VERSION.to_string(),
            payload_type: DEFAULT_PAYLOAD_TYPE.to_string(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            callback_location: DEFAULT_CALLBACK_LOCATION.to_string(),
            policy: PolicyConfig::default(),
        }
    }
}

impl LinkingConfig {
    /// Defaults with environment overrides applied.
    ///
    /// # Environment Variables
    ///
    /// - `EL_CHALLENGE_LIFETIME_MS`: challenge lifetime (default: 600000)
    /// - `EL_MAX_PAYLOAD_BYTES`: transport ceiling (default: 2048)
    /// - `EL_ENVIRONMENT`: environment tag (default: sandbox)
    /// - `EL_CALLBACK_LOCATION`: callback URI
    /// - `EL_MAX_SCAN_DEPTH`: policy nesting limit (default: 64)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `EL_*` overrides read through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("EL_CHALLENGE_LIFETIME_MS") {
            self.challenge_lifetime_ms = parse_var("EL_CHALLENGE_LIFETIME_MS", &value)?;
        }
        if let Some(value) = lookup("EL_MAX_PAYLOAD_BYTES") {
            self.max_payload_bytes = parse_var("EL_MAX_PAYLOAD_BYTES", &value)?;
        }
        if let Some(value) = lookup("EL_ENVIRONMENT") {
            self.environment = value;
        }
        if let Some(value) = lookup("EL_CALLBACK_LOCATION") {
            self.callback_location = value;
        }
        if let Some(value) = lookup("EL_MAX_SCAN_DEPTH") {
            self.policy.max_depth = parse_var("EL_MAX_SCAN_DEPTH", &value)?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.challenge_lifetime_ms == 0 {
            return Err(ConfigError::InvalidLifetime(
                "challenge_lifetime_ms cannot be 0".into(),
            ));
        }

        if self.max_payload_bytes == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_payload_bytes cannot be 0".into(),
            ));
        }

        if self.payload_version.trim().is_empty() || self.payload_type.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "payload version and type must be set".into(),
            ));
        }

        if !has_uri_scheme(&self.callback_location) {
            return Err(ConfigError::InvalidCallback(
                self.callback_location.clone(),
            ));
        }

        self.policy.validate()?;
        Ok(())
    }

    /// Challenge lifetime as a `Duration`.
    pub fn challenge_lifetime(&self) -> Duration {
        Duration::from_millis(self.challenge_lifetime_ms)
    }
}

/// True for `scheme:rest` where the scheme is RFC 3986 shaped and `rest`
/// is not empty.
pub(crate) fn has_uri_scheme(location: &str) -> bool {
    let Some((scheme, rest)) = location.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    starts_alpha
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !rest.trim_start_matches('/').is_empty()
}

fn parse_var<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv {
            name,
            value: value.to_string(),
        })
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Zero or unusable lifetime
    #[error("invalid lifetime: {0}")]
    InvalidLifetime(String),
    /// Invalid size limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Callback location has no URI scheme
    #[error("invalid callback location: {0:?}")]
    InvalidCallback(String),
    /// An environment override could not be parsed
    #[error("invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },
    /// Policy vocabulary is unusable
    #[error("invalid policy: {0}")]
    Policy(#[from] PolicyConfigError),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
