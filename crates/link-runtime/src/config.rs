//! # Runtime Configuration
//!
//! `LinkingConfig` from an optional JSON file, then `EL_*` environment
//! overrides, then validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ql_01_account_linking::LinkingConfig;

/// Load configuration from `path` (if any) and the process environment.
pub fn load_config(path: Option<&Path>) -> Result<LinkingConfig> {
    load_config_with(path, |name| std::env::var(name).ok())
}

/// Same as [`load_config`] over an arbitrary variable source.
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<LinkingConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let base = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_json::from_str::<LinkingConfig>(&raw)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        }
        None => LinkingConfig::default(),
    };

    let config = base
        .with_overrides(lookup)
        .context("invalid linking configuration")?;

    tracing::debug!(
        environment = %config.environment,
        challenge_lifetime_ms = config.challenge_lifetime_ms,
        max_payload_bytes = config.max_payload_bytes,
        "configuration loaded"
    );
    Ok(config)
}
