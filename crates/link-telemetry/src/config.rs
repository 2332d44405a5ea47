//! Telemetry configuration from environment variables.

use std::env;

pub const DEFAULT_SERVICE_NAME: &str = "edge-link";

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to the startup event
    pub service_name: String,

    /// Filter directive (`info`, `ql_01_account_linking=debug,warn`, ...)
    pub log_level: String,

    /// Whether to write events to stderr at all
    pub console_output: bool,

    /// Whether to emit JSON lines instead of pretty text
    pub json_logs: bool,

    /// Deployment label (sandbox, production)
    pub environment: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            console_output: true,
            json_logs: false,
            environment: "sandbox".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `EL_SERVICE_NAME`: Service name (default: edge-link)
    /// - `RUST_LOG`, else `EL_LOG_LEVEL`: Log filter (default: info)
    /// - `EL_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `EL_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `EL_ENVIRONMENT`: Deployment label (default: sandbox)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("EL_SERVICE_NAME").unwrap_or(defaults.service_name),

            log_level: lookup("RUST_LOG")
                .or_else(|| lookup("EL_LOG_LEVEL"))
                .unwrap_or(defaults.log_level),

            console_output: lookup("EL_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: lookup("EL_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            environment: lookup("EL_ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Override the filter, e.g. from a `--log-level` flag. Wins over both
    /// environment variables.
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}
