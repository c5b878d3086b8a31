//! Remote-control Telegram bot
//!
//! Long-polls for messages and lets a single authorised user inspect,
//! restart or reconnect the netbird client.

use crate::clock::Clock;
use crate::context::MonitorContext;
use crate::error::{CommandError, ConfigError, NotifyError, WatchError};
use crate::notify::message::escape_html;
use crate::notify::telegram::Message;
use crate::notify::BotApi;
use crate::vpn::{
    CommandOutput, CommandRunner, CommandSpec, NetbirdCli, OutputParser, StatusLabel,
    StatusProber,
};
use chrono::Local;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub mod commands;

pub use commands::{BotCommand, HELP_TEXT};

/// Pause after restarting the daemon before `up`, and before the final ping
const SERVICE_SETTLE: Duration = Duration::from_secs(3);

/// Which command produced the `up` output being reported
#[derive(Debug, Clone, Copy)]
enum UpFlow {
    Restart,
    Reconnect,
}

impl UpFlow {
    fn auth_hint(self) -> &'static str {
        match self {
            UpFlow::Restart => "After logging in, run /vpn_restart again",
            UpFlow::Reconnect => "After logging in, run /vpn_restart",
        }
    }

    fn succeeded(self) -> &'static str {
        match self {
            UpFlow::Restart => "✅ VPN restarted successfully!",
            UpFlow::Reconnect => "✅ VPN reconnected successfully!",
        }
    }

    fn failed(self) -> &'static str {
        match self {
            UpFlow::Restart => "⚠️ Daemon restarted, but the VPN did not connect",
            UpFlow::Reconnect => "⚠️ VPN did not connect. Try /vpn_restart",
        }
    }

    fn timed_out(self) -> &'static str {
        match self {
            UpFlow::Restart => "❌ Timed out while restarting",
            UpFlow::Reconnect => "❌ Timed out. Try /vpn_restart",
        }
    }
}

/// Long-polling command bot
pub struct VpnBot {
    api: Arc<dyn BotApi>,
    cli: NetbirdCli,
    admin_cli: NetbirdCli,
    prober: StatusProber,
    runner: Arc<dyn CommandRunner>,
    parser: Arc<OutputParser>,
    clock: Arc<dyn Clock>,
    allowed_user_id: i64,
    service: String,
    use_sudo: bool,
    service_timeout: Duration,
    teardown_pause: Duration,
    establish_pause: Duration,
    poll_timeout_secs: u64,
    error_pause: Duration,
    offset: i64,
}

impl VpnBot {
    /// Build the bot; needs a bot token and an allowed user id
    pub fn from_context(context: &MonitorContext) -> Result<Self, WatchError> {
        let api = context.require_bot_api()?;
        let config = &context.config;

        let allowed_user_id = config.bot.allowed_user_id.ok_or_else(|| ConfigError::MissingField {
            field: "bot.allowed_user_id".to_string(),
        })?;

        Ok(Self {
            api,
            cli: context.netbird_cli(),
            admin_cli: context.netbird_cli().with_sudo(config.bot.use_sudo),
            prober: context.prober(),
            runner: Arc::clone(&context.runner),
            parser: Arc::clone(&context.parser),
            clock: Arc::clone(&context.clock),
            allowed_user_id,
            service: config.netbird.service.clone(),
            use_sudo: config.bot.use_sudo,
            service_timeout: config.timeouts.service_restart(),
            teardown_pause: Duration::from_secs(config.reconnection.teardown_pause_secs),
            establish_pause: Duration::from_secs(config.reconnection.establish_pause_secs),
            poll_timeout_secs: config.bot.poll_timeout_secs,
            error_pause: Duration::from_secs(config.bot.error_pause_secs),
            offset: 0,
        })
    }

    /// Offset of the next `getUpdates` call
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Poll until `shutdown` resolves
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!("VPN bot started, allowed user: {}", self.allowed_user_id);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("VPN bot stopped");
                    break;
                }
                _ = self.poll_once() => {}
            }
        }
    }

    /// Fetch one batch of updates and handle every message in it
    ///
    /// Returns the number of updates consumed.
    pub async fn poll_once(&mut self) -> usize {
        let updates = match self.api.get_updates(self.offset, self.poll_timeout_secs).await {
            Ok(updates) => updates,
            Err(NotifyError::Http(e)) if e.is_timeout() => {
                debug!("Long poll timed out");
                return 0;
            }
            Err(e) => {
                error!("Failed to fetch updates: {}", e);
                self.clock.sleep(self.error_pause).await;
                return 0;
            }
        };

        let count = updates.len();
        for update in updates {
            self.offset = update.update_id + 1;
            if let Some(message) = update.message {
                self.handle_message(&message).await;
            }
        }
        count
    }

    /// Check access and dispatch one incoming message
    pub async fn handle_message(&self, message: &Message) {
        let text = message.text.as_deref().unwrap_or("").trim();
        let user_id = message.from.as_ref().map(|u| u.id);
        let username = message
            .from
            .as_ref()
            .and_then(|u| u.username.as_deref())
            .unwrap_or("unknown");
        let chat_id = message.chat.id.to_string();

        info!("Message from {} ({:?}): {}", username, user_id, text);

        if user_id != Some(self.allowed_user_id) {
            warn!("Access denied for user {:?}", user_id);
            self.reply(&chat_id, "⛔ Access denied").await;
            return;
        }

        match BotCommand::parse(text) {
            None => debug!("Ignoring plain text"),
            Some(BotCommand::Help) => self.reply(&chat_id, HELP_TEXT).await,
            Some(BotCommand::Status) => self.cmd_status(&chat_id).await,
            Some(BotCommand::Restart) => self.cmd_restart(&chat_id).await,
            Some(BotCommand::Reconnect) => self.cmd_reconnect(&chat_id).await,
            Some(BotCommand::Unknown(name)) => {
                debug!("Unknown command {}", name);
                self.reply(&chat_id, "Unknown command. Use /help").await;
            }
        }
    }

    async fn cmd_status(&self, chat_id: &str) {
        self.reply(chat_id, "🔍 Checking VPN status...").await;

        let output = match self.cli.status_detailed().await {
            Ok(output) => output,
            Err(CommandError::Timeout { .. }) => {
                self.reply(chat_id, "❌ Timed out while reading the status").await;
                return;
            }
            Err(e) => {
                self.reply(chat_id, &error_reply(&e)).await;
                return;
            }
        };

        let status = self.parser.parse_detailed_status(&output.stdout);
        let reachable = self.prober.check_reachability().await;
        let label = StatusLabel::from_status(&status, reachable);

        let emoji = match label {
            StatusLabel::Connected => "✅",
            StatusLabel::AuthRequired => "🔐",
            StatusLabel::Disconnected => "❌",
        };

        let text = format!(
            "{emoji} <b>VPN Status: {label}</b>\n\n\
             <b>Management:</b> {}\n\
             <b>Signal:</b> {}\n\
             <b>Peers:</b> {}\n\
             <b>NetBird IP:</b> {}\n\
             <b>Internal hosts ping:</b> {}\n\n\
             <i>Time: {}</i>",
            escape_html(&status.management),
            escape_html(&status.signal),
            escape_html(&status.peers),
            escape_html(&status.ip),
            if reachable { "✅" } else { "❌" },
            Local::now().format("%H:%M:%S"),
        );
        self.reply(chat_id, &text).await;
    }

    async fn cmd_restart(&self, chat_id: &str) {
        self.reply(chat_id, "🔄 Restarting the netbird daemon...").await;

        let spec = CommandSpec::new(
            "systemctl",
            ["restart", self.service.as_str()],
            self.service_timeout,
        )
        .elevated(self.use_sudo);
        info!("Running: {}", spec.command_line());

        match self.runner.run(&spec).await {
            Ok(output) if output.success() => {}
            Ok(output) => {
                let text = format!("❌ Restart failed: {}", escape_html(output.stderr.trim()));
                self.reply(chat_id, &text).await;
                return;
            }
            Err(CommandError::Timeout { .. }) => {
                self.reply(chat_id, UpFlow::Restart.timed_out()).await;
                return;
            }
            Err(e) => {
                self.reply(chat_id, &error_reply(&e)).await;
                return;
            }
        }

        self.clock.sleep(SERVICE_SETTLE).await;
        self.bring_up(chat_id, UpFlow::Restart, SERVICE_SETTLE).await;
    }

    async fn cmd_reconnect(&self, chat_id: &str) {
        self.reply(chat_id, "🔄 Reconnecting VPN...").await;

        match self.admin_cli.down().await {
            Ok(output) if !output.success() => {
                warn!("netbird down exited with {:?}", output.exit_code);
            }
            Ok(_) => {}
            Err(CommandError::Timeout { .. }) => {
                self.reply(chat_id, UpFlow::Reconnect.timed_out()).await;
                return;
            }
            Err(e) => {
                self.reply(chat_id, &error_reply(&e)).await;
                return;
            }
        }

        self.clock.sleep(self.teardown_pause).await;
        self.bring_up(chat_id, UpFlow::Reconnect, self.establish_pause)
            .await;
    }

    /// Run `up` and report: already connected, SSO link, or ping result after `settle`
    async fn bring_up(&self, chat_id: &str, flow: UpFlow, settle: Duration) {
        let up: CommandOutput = match self.admin_cli.up().await {
            Ok(output) => output,
            Err(CommandError::Timeout { .. }) => {
                self.reply(chat_id, flow.timed_out()).await;
                return;
            }
            Err(e) => {
                self.reply(chat_id, &error_reply(&e)).await;
                return;
            }
        };

        let combined = up.combined();
        if self.parser.already_connected(&combined) {
            self.reply(chat_id, "✅ VPN is connected!").await;
            return;
        }

        if let Some(url) = self.parser.extract_auth_url(&combined) {
            let text = format!(
                "🔐 <b>SSO authorization required</b>\n\n{}\n\n{}",
                escape_html(&url),
                flow.auth_hint()
            );
            self.reply(chat_id, &text).await;
            return;
        }

        self.clock.sleep(settle).await;
        if self.prober.check_reachability().await {
            self.reply(chat_id, flow.succeeded()).await;
        } else {
            self.reply(chat_id, flow.failed()).await;
        }
    }

    /// Single delivery attempt; failures are only logged
    async fn reply(&self, chat_id: &str, text: &str) {
        if let Err(e) = self.api.send_message(chat_id, text).await {
            error!("Failed to send reply: {}", e);
        }
    }
}

fn error_reply(e: &CommandError) -> String {
    format!("❌ Error: {}", escape_html(&e.to_string()))
}
