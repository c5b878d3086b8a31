//! Human-readable status report

use anyhow::{Context, Result};
use colored::Colorize;
use nbwatch_core::config::MonitorConfig;
use nbwatch_core::vpn::{ConnectivityState, DetailedStatus, StatusLabel};
use nbwatch_core::MonitorContext;
use tracing::warn;

/// Print client status, reachability and the persisted record
pub async fn run_status(config: MonitorConfig) -> Result<u8> {
    let context = MonitorContext::from_config(config).context("Failed to set up status check")?;
    let cli = context.netbird_cli();

    if !cli.is_installed() {
        println!(
            "{} '{}' was not found in PATH",
            "✗".red(),
            context.config.netbird.binary
        );
    }

    let status = match cli.status_detailed().await {
        Ok(output) => context.parser.parse_detailed_status(&output.stdout),
        Err(e) => {
            warn!("Could not read detailed status: {}", e);
            DetailedStatus::default()
        }
    };
    let probe = context.prober().probe().await;
    let label = StatusLabel::from_status(&status, probe.reachable);

    let headline = match label {
        StatusLabel::Connected => format!("● {}", label).green().bold(),
        StatusLabel::AuthRequired => format!("● {}", label).yellow().bold(),
        StatusLabel::Disconnected => format!("● {}", label).red().bold(),
    };
    println!("VPN: {}", headline);
    println!("  Management:  {}", status.management);
    println!("  Signal:      {}", status.signal);
    println!("  Peers:       {}", status.peers);
    println!("  NetBird IP:  {}", status.ip);
    println!(
        "  Client:      {}",
        if probe.client_ok { "connected".green() } else { "not connected".red() }
    );
    println!(
        "  Ping:        {}",
        if probe.reachable { "reachable".green() } else { "unreachable".red() }
    );

    let store = context.state_store()?;
    println!();
    println!("Watchdog state ({}):", store.path().display());

    match store.try_load() {
        Ok(Some(record)) => {
            let last_status = match record.last_status {
                ConnectivityState::Connected => record.last_status.to_string().green(),
                ConnectivityState::Unknown => record.last_status.to_string().normal(),
                _ => record.last_status.to_string().red(),
            };
            println!("  Last status:          {}", last_status);
            println!("  Last check:           {}", format_time(record.last_check));
            println!(
                "  Last notification:    {}",
                format_time(record.last_notification_time)
            );
            println!("  Reconnects:           {}", record.reconnect_count);
            println!("  Consecutive failures: {}", record.consecutive_failures);
        }
        Ok(None) => println!("  No watchdog runs recorded yet"),
        Err(e) => println!("  {} {}", "State file unreadable:".red(), e),
    }

    Ok(if probe.is_connected() { 0 } else { 1 })
}

fn format_time(value: Option<chrono::DateTime<chrono::Local>>) -> String {
    value
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string())
}
