//! Remote-control bot command

use anyhow::{Context, Result};
use nbwatch_core::bot::VpnBot;
use nbwatch_core::config::MonitorConfig;
use nbwatch_core::MonitorContext;
use tracing::error;

/// Poll Telegram until Ctrl-C
pub async fn run_bot(config: MonitorConfig) -> Result<u8> {
    let context = MonitorContext::from_config(config).context("Failed to set up the bot")?;
    let mut bot = VpnBot::from_context(&context).context(
        "The bot needs TELEGRAM_BOT_TOKEN and VPN_BOT_ALLOWED_USER_ID (or bot.allowed_user_id)",
    )?;

    println!("VPN bot running, press Ctrl-C to stop");

    bot.run(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await;

    Ok(0)
}
