//! One watchdog run, meant to be started by a systemd timer or cron

use anyhow::{Context, Result};
use nbwatch_core::config::MonitorConfig;
use nbwatch_core::MonitorContext;
use tracing::{info, warn};

/// Probe, repair and notify; exit code 0 when the tunnel was up
pub async fn run_check(config: MonitorConfig) -> Result<u8> {
    if !config.credentials.is_complete() {
        warn!("TELEGRAM_BOT_TOKEN or VPN_MONITOR_CHAT_ID is not set, notifications are disabled");
    }

    let context = MonitorContext::from_config(config).context("Failed to set up the watchdog")?;
    let monitor = context
        .monitor()
        .context("Failed to locate the state file")?;

    let summary = monitor.run_once().await;

    info!(
        "Check finished: {} -> {}, {} notification(s)",
        summary.previous,
        summary.record.last_status,
        summary.notifications.len()
    );

    Ok(summary.exit_code())
}
