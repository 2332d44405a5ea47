//! # Link Telemetry
//!
//! Structured logging for the Edge-Link binaries and services.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use link_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(&TelemetryConfig::from_env())?;
//!     // Events from every crate now reach stderr
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RUST_LOG` | unset | Filter directive, takes precedence |
//! | `EL_LOG_LEVEL` | `info` | Filter directive when `RUST_LOG` is unset |
//!
//! A `--log-level` flag passed through [`TelemetryConfig::with_log_level`]
//! overrides both variables.
//! | `EL_JSON_LOGS` | `true` in containers | JSON lines instead of pretty text |
//! | `EL_CONSOLE_OUTPUT` | `true` | Disable to drop all output |
//! | `EL_SERVICE_NAME` | `edge-link` | Service name on the startup event |
//!
//! Output always goes to stderr so command output on stdout stays clean.

mod config;
mod subscriber;

pub use config::{TelemetryConfig, DEFAULT_LOG_LEVEL, DEFAULT_SERVICE_NAME};
pub use subscriber::build_filter;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    /// The filter directive did not parse
    #[error("Invalid log filter `{directive}`: {reason}")]
    Filter { directive: String, reason: String },

    /// A global subscriber is already installed
    #[error("Telemetry already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Install the global subscriber.
///
/// Returns a guard that should be held for the lifetime of the process.
/// Calling this a second time returns [`TelemetryError::AlreadyInitialized`].
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    subscriber::install(config)?;

    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        json_logs = config.json_logs,
        "telemetry initialized"
    );

    Ok(TelemetryGuard {
        service_name: config.service_name.clone(),
    })
}

/// Guard that marks telemetry as active.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::debug!(service = %self.service_name, "telemetry shutting down");
    }
}

/// Span wrapping one linking attempt.
///
/// # Example
///
/// ```rust,ignore
/// let _span = link_telemetry::attempt_span!(fingerprint = %link.fingerprint).entered();
/// ```
#[macro_export]
macro_rules! attempt_span {
    ($($field:tt)*) => {
        tracing::info_span!("link_attempt", $($field)*)
    };
}
