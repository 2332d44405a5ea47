//! # Edge-Link Runtime
//!
//! Operator entry point for the account-linking subsystem.
//!
//! ## Modules
//!
//! - `cli` - clap argument definitions
//! - `config` - configuration file and environment loading
//! - `commands` - `issue`, `decode`, `scan` and `demo`
//!
//! ## Startup Sequence
//!
//! 1. Parse arguments
//! 2. Install telemetry (stderr, pretty or JSON)
//! 3. Load configuration (file, then `EL_*` variables, then validation)
//! 4. Run the subcommand and map its outcome to an exit code

pub mod cli;
pub mod commands;
pub mod config;

pub use cli::{Cli, Command};
pub use config::{load_config, load_config_with};

/// Exit code for a `scan` that found forbidden content.
pub const EXIT_UNSAFE: u8 = 2;
