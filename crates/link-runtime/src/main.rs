//! `link-runtime` binary.

use std::io::Read;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use link_runtime::commands::{self, DemoOptions};
use link_runtime::{load_config, Cli, Command, EXIT_UNSAFE};
use link_telemetry::{init_telemetry, TelemetryConfig};
use ql_01_account_linking::domain::time::now_millis;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if let Some(level) = &cli.log_level {
        telemetry = telemetry.with_log_level(level.clone());
    }
    let _guard = match init_telemetry(&telemetry) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Issue { lifetime_ms, json } => {
            let report = commands::issue(&config, lifetime_ms, now_millis())?;
            if json {
                print_json(&report)?;
            } else {
                println!("{}", report.transport);
            }
        }
        Command::Decode { payload } => {
            let report = commands::decode(&config, &payload, now_millis())?;
            print_json(&report)?;
        }
        Command::Scan { input } => {
            let document = read_input(&input)?;
            let verdict = commands::scan(&config, &document)?;
            print_json(&verdict)?;
            if !verdict.safe {
                return Ok(ExitCode::from(EXIT_UNSAFE));
            }
        }
        Command::Demo {
            wallet,
            attempts,
            scan_delay_ms,
        } => {
            let options = DemoOptions {
                wallet,
                attempts,
                scan_delay_ms,
            };
            let report = commands::demo(&config, &options, now_millis()).await?;
            print_json(&report)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn read_input(input: &str) -> Result<Vec<u8>> {
    if input == "-" {
        let mut buffer = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buffer)
            .context("failed to read stdin")?;
        return Ok(buffer);
    }
    std::fs::read(input).with_context(|| format!("failed to read {input}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{text}");
    Ok(())
}
