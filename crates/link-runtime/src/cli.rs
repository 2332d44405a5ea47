//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "link-runtime")]
#[command(about = "Edge-protected QR account linking: issue, inspect and exercise link challenges")]
#[command(version)]
pub struct Cli {
    /// JSON configuration file (EL_* variables override it)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter directive, e.g. `debug` or `ql_01_account_linking=trace`
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Issue a challenge and print its transport payload
    Issue {
        /// Lifetime override in milliseconds
        #[arg(long)]
        lifetime_ms: Option<u64>,

        /// Print a JSON report instead of the bare transport string
        #[arg(long)]
        json: bool,
    },

    /// Decode and check a scanned transport payload
    Decode {
        /// Base64url transport string
        payload: String,
    },

    /// Check a JSON document against the sensitivity policy (exit 2 if unsafe)
    Scan {
        /// File to scan, or `-` for stdin
        #[arg(default_value = "-")]
        input: String,
    },

    /// Run complete links in process with a generated device key
    Demo {
        /// Wallet address the device claims
        #[arg(long, default_value = "addr1_sandbox_test_wallet_001")]
        wallet: String,

        /// Number of links to attempt
        #[arg(long, default_value = "1")]
        attempts: u32,

        /// Simulated delay between issuance and scan
        #[arg(long, default_value = "1500")]
        scan_delay_ms: u64,
    },
}
