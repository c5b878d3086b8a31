//! Explicit wiring of the collaborators shared by every command

use crate::clock::{Clock, SystemClock};
use crate::config::MonitorConfig;
use crate::error::{NotifyError, WatchError};
use crate::monitor::{Monitor, StateStore};
use crate::notify::{BotApi, NotificationTransport, Notifier, TelegramClient};
use crate::vpn::{
    CommandRunner, NetbirdCli, OutputParser, ReconnectController, StatusProber,
    SystemCommandRunner,
};
use std::sync::Arc;

/// Everything a command needs, built once from the configuration
#[derive(Clone)]
pub struct MonitorContext {
    pub config: Arc<MonitorConfig>,
    pub runner: Arc<dyn CommandRunner>,
    pub clock: Arc<dyn Clock>,
    pub parser: Arc<OutputParser>,
    pub transport: Option<Arc<dyn NotificationTransport>>,
    pub bot_api: Option<Arc<dyn BotApi>>,
}

impl MonitorContext {
    /// Production wiring: real processes, wall clock and the Telegram API
    ///
    /// The Telegram client only exists when a bot token is configured.
    pub fn from_config(config: MonitorConfig) -> Result<Self, WatchError> {
        let token = config.credentials.bot_token.clone();
        let mut context = Self::new(config, Arc::new(SystemCommandRunner), Arc::new(SystemClock));

        if let Some(token) = token {
            let client = Arc::new(TelegramClient::new(token, &context.config.notification)?);
            context.transport = Some(Arc::clone(&client) as Arc<dyn NotificationTransport>);
            context.bot_api = Some(client as Arc<dyn BotApi>);
        }

        Ok(context)
    }

    /// Context without any Telegram access
    pub fn new(config: MonitorConfig, runner: Arc<dyn CommandRunner>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: Arc::new(config),
            runner,
            clock,
            parser: Arc::new(OutputParser::new()),
            transport: None,
            bot_api: None,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn NotificationTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_bot_api(mut self, bot_api: Arc<dyn BotApi>) -> Self {
        self.bot_api = Some(bot_api);
        self
    }

    pub fn netbird_cli(&self) -> NetbirdCli {
        NetbirdCli::new(
            Arc::clone(&self.runner),
            &self.config.netbird,
            self.config.timeouts.clone(),
        )
    }

    pub fn prober(&self) -> StatusProber {
        StatusProber::new(
            self.netbird_cli(),
            Arc::clone(&self.runner),
            Arc::clone(&self.parser),
            &self.config.probe,
            self.config.timeouts.clone(),
        )
    }

    pub fn reconnect_controller(&self) -> ReconnectController {
        ReconnectController::new(
            self.netbird_cli(),
            self.prober(),
            Arc::clone(&self.parser),
            Arc::clone(&self.clock),
            self.config.reconnection.clone(),
        )
    }

    /// Notifier for the monitoring chat
    pub fn notifier(&self) -> Notifier {
        Notifier::new(
            self.transport.clone(),
            self.config.credentials.chat_id.clone(),
            Arc::clone(&self.clock),
            self.config.notification.retry.clone(),
        )
    }

    pub fn state_store(&self) -> Result<StateStore, WatchError> {
        Ok(StateStore::new(self.config.paths.state_file()?))
    }

    pub fn monitor(&self) -> Result<Monitor, WatchError> {
        Ok(Monitor::new(
            self.prober(),
            self.reconnect_controller(),
            self.notifier(),
            self.state_store()?,
            Arc::clone(&self.clock),
            self.config.notification.cooldown(),
        ))
    }

    /// Bot API handle, required by the remote-control bot
    pub fn require_bot_api(&self) -> Result<Arc<dyn BotApi>, NotifyError> {
        self.bot_api.clone().ok_or(NotifyError::NotConfigured)
    }
}
