//! nbwatch - Netbird VPN watchdog
//!
//! Checks the tunnel from a timer, reconnects it when it drops, reports
//! status changes to Telegram, and offers a bot for manual control.

use clap::{Parser, Subcommand};
use nbwatch_core::config::toml_config::{load_config, load_config_from_path};
use nbwatch_core::{init_logging, install_panic_hook, panic_message};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::task::JoinError;
use tracing::error;

mod cli;

#[derive(Parser)]
#[command(name = "nbwatch", version)]
#[command(about = "Netbird VPN watchdog with auto-reconnect and Telegram notifications")]
struct Cli {
    /// Configuration file (default: ~/.config/nbwatch/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the tunnel once, reconnect and notify as needed
    Check,
    /// Run the Telegram remote-control bot until interrupted
    Bot,
    /// Show client status, reachability and the watchdog record
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(2);
        }
    };

    let log_file = match cli.command {
        Commands::Bot => config.paths.bot_log_file(),
        Commands::Check | Commands::Status => config.paths.log_file(),
    };
    let log_file = match log_file {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(2);
        }
    };

    // Flushes the log file when main returns
    let _guard = match init_logging(&config.logging, &log_file) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(2);
        }
    };

    install_panic_hook();

    let command = cli.command;
    let result = tokio::spawn(async move {
        match command {
            Commands::Check => cli::check::run_check(config).await,
            Commands::Bot => cli::bot::run_bot(config).await,
            Commands::Status => cli::status::run_status(config).await,
        }
    })
    .await;

    ExitCode::from(exit_code(result))
}

/// Map the command outcome to the process exit code; panics count as failures
fn exit_code(result: Result<anyhow::Result<u8>, JoinError>) -> u8 {
    match result {
        Ok(Ok(code)) => code,
        Ok(Err(e)) => {
            error!("{:?}", e);
            1
        }
        Err(e) if e.is_panic() => {
            error!("Command panicked: {}", panic_message(e.into_panic().as_ref()));
            1
        }
        Err(e) => {
            error!("Command task failed: {}", e);
            1
        }
    }
}
