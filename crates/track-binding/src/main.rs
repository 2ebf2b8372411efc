//! Track Binding replay tool
//!
//! Runs a JSON scenario against one binding and prints what was attached and
//! detached.
//!
//! ```text
//! track-binding demos/bob-loads-slowly.json
//! ```
//!
//! # Flow
//!
//! 1. Parse the command line
//! 2. Load configuration from environment (`TB_*` variables)
//! 3. Initialize tracing (`RUST_LOG`, `TB_LOG_JSON`)
//! 4. Replay the scenario on a binding actor
//! 5. Print the report as JSON on stdout

#![warn(clippy::pedantic)]

use std::path::PathBuf;

use clap::Parser;
use track_binding::config::Config;
use track_binding::observability::DEFAULT_LOG_FILTER;
use track_binding::replay::{run_script, Script};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Replay a membership scenario against one track binding
#[derive(Parser, Debug)]
#[command(name = "track-binding")]
#[command(about = "Replay a membership scenario against one track binding", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON scenario file
    scenario: PathBuf,

    /// Print the report on a single line
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::from_env();

    // Initialize tracing
    let log_json = config.as_ref().is_ok_and(|c| c.log_json);
    let (plain_layer, json_layer) = if log_json {
        (None, Some(tracing_subscriber::fmt::layer().json()))
    } else {
        (Some(tracing_subscriber::fmt::layer()), None)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(plain_layer)
        .with(json_layer)
        .init();

    let config = config.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        retry_delay_ms = config.retry_delay.as_millis(),
        max_retry_attempts = ?config.max_retry_attempts,
        mailbox_buffer = config.mailbox_buffer,
        "Configuration loaded"
    );

    let script = Script::from_path(&cli.scenario).map_err(|e| {
        error!(path = %cli.scenario.display(), "Failed to load scenario: {}", e);
        e
    })?;

    let report = run_script(script, &config).await?;
    let rendered = if cli.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    println!("{rendered}");

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_takes_scenario_path() {
        let cli = Cli::try_parse_from(["track-binding", "demos/bob-loads-slowly.json"]).unwrap();
        assert_eq!(cli.scenario, PathBuf::from("demos/bob-loads-slowly.json"));
        assert!(!cli.compact);

        let cli = Cli::try_parse_from(["track-binding", "--compact", "s.json"]).unwrap();
        assert!(cli.compact);
    }

    #[test]
    fn test_cli_help_is_not_a_scenario() {
        let err = Cli::try_parse_from(["track-binding", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);

        let err = Cli::try_parse_from(["track-binding"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }
}
