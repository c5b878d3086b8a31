//! Configuration module
//!
//! Non-sensitive settings come from a TOML file where every field has a
//! default, so an absent file is a valid configuration. The Telegram token
//! and chat identifiers come from the environment.

use crate::error::ConfigError;
use crate::notify::NotifyPolicy;
use crate::types::{TelegramCredentials, ENV_BOT_ALLOWED_USER};
use crate::vpn::reconnection::ReconnectPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod toml_config;

/// Complete watchdog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// VPN client binary and service
    pub netbird: NetbirdConfig,

    /// Reachability probe targets
    pub probe: ProbeConfig,

    /// Reconnect loop pacing
    pub reconnection: ReconnectPolicy,

    /// Telegram delivery settings
    pub notification: NotificationConfig,

    /// Per-command timeouts
    pub timeouts: CommandTimeouts,

    /// State and log file locations
    pub paths: PathsConfig,

    /// Log rotation settings
    pub logging: LogConfig,

    /// Remote-control bot settings
    pub bot: BotConfig,

    /// Credentials resolved from the environment, never written to disk
    #[serde(skip)]
    pub credentials: TelegramCredentials,
}

impl MonitorConfig {
    /// Fill in the environment-provided secrets and identifiers
    pub fn apply_env(&mut self) {
        self.apply_lookup(|key| std::env::var(key).ok());
    }

    /// Same as [`MonitorConfig::apply_env`] with an explicit lookup
    pub fn apply_lookup<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.credentials = TelegramCredentials::from_lookup(&lookup);

        if let Some(id) = lookup(ENV_BOT_ALLOWED_USER).and_then(|v| v.trim().parse::<i64>().ok())
        {
            self.bot.allowed_user_id = Some(id);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.netbird.binary.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "netbird.binary".to_string(),
            });
        }

        if self.probe.hosts.iter().all(|h| h.trim().is_empty()) {
            return Err(ConfigError::MissingField {
                field: "probe.hosts".to_string(),
            });
        }

        self.reconnection
            .validate()
            .map_err(|e| ConfigError::ValidationError {
                message: format!("Invalid reconnection policy: {}", e),
            })?;

        self.notification.validate()?;
        self.timeouts.validate()?;

        if self.logging.max_bytes == 0 {
            return Err(ConfigError::ValidationError {
                message: "logging.max_bytes cannot be zero".to_string(),
            });
        }

        if self.logging.backups == 0 {
            return Err(ConfigError::ValidationError {
                message: "logging.backups cannot be zero".to_string(),
            });
        }

        Ok(())
    }
}

/// Netbird client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetbirdConfig {
    /// Client executable name or path
    pub binary: String,

    /// systemd unit restarted by the bot's `/vpn_restart`
    pub service: String,
}

impl Default for NetbirdConfig {
    fn default() -> Self {
        Self {
            binary: "netbird".to_string(),
            service: "netbird".to_string(),
        }
    }
}

/// Internal hosts pinged to confirm the tunnel actually routes traffic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Hosts tried in order, first responder wins
    pub hosts: Vec<String>,

    /// Per-reply wait passed to `ping -W`
    pub ping_wait_secs: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            hosts: vec![
                "wms-clickhouse.prod.um.internal".to_string(),
                "dwh-clickhouse.prod.um.internal".to_string(),
            ],
            ping_wait_secs: 2,
        }
    }
}

/// One week
const MAX_COOLDOWN_MINUTES: u64 = 7 * 24 * 60;

/// Telegram delivery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Bot API base URL, overridable for tests and proxies
    pub api_base_url: String,

    /// Bind outgoing connections to IPv4
    pub ipv4_only: bool,

    /// Minimum gap between two problem notifications
    pub cooldown_minutes: u64,

    /// Delivery retry budget and backoff
    pub retry: NotifyPolicy,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.telegram.org".to_string(),
            ipv4_only: true,
            cooldown_minutes: 30,
            retry: NotifyPolicy::default(),
        }
    }
}

impl NotificationConfig {
    /// Cooldown as a duration
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_minutes * 60)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.api_base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::InvalidUrl {
                    url: self.api_base_url.clone(),
                })
            }
        }

        if self.cooldown_minutes == 0 {
            return Err(ConfigError::ValidationError {
                message: "notification.cooldown_minutes cannot be zero".to_string(),
            });
        }
        if self.cooldown_minutes > MAX_COOLDOWN_MINUTES {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "notification.cooldown_minutes cannot exceed {}",
                    MAX_COOLDOWN_MINUTES
                ),
            });
        }

        self.retry
            .validate()
            .map_err(|e| ConfigError::ValidationError {
                message: format!("Invalid notification retry policy: {}", e),
            })
    }
}

/// Timeouts applied to each external command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandTimeouts {
    pub status_secs: u64,
    pub up_down_secs: u64,
    pub login_secs: u64,
    pub ping_secs: u64,
    pub service_restart_secs: u64,
}

impl Default for CommandTimeouts {
    fn default() -> Self {
        Self {
            status_secs: 10,
            up_down_secs: 15,
            login_secs: 30,
            ping_secs: 5,
            service_restart_secs: 30,
        }
    }
}

impl CommandTimeouts {
    pub fn status(&self) -> Duration {
        Duration::from_secs(self.status_secs)
    }

    pub fn up_down(&self) -> Duration {
        Duration::from_secs(self.up_down_secs)
    }

    pub fn login(&self) -> Duration {
        Duration::from_secs(self.login_secs)
    }

    pub fn ping(&self) -> Duration {
        Duration::from_secs(self.ping_secs)
    }

    pub fn service_restart(&self) -> Duration {
        Duration::from_secs(self.service_restart_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let all = [
            ("status_secs", self.status_secs),
            ("up_down_secs", self.up_down_secs),
            ("login_secs", self.login_secs),
            ("ping_secs", self.ping_secs),
            ("service_restart_secs", self.service_restart_secs),
        ];

        match all.iter().find(|(_, v)| *v == 0) {
            Some((name, _)) => Err(ConfigError::ValidationError {
                message: format!("timeouts.{} cannot be zero", name),
            }),
            None => Ok(()),
        }
    }
}

/// File locations; unset paths resolve inside the home directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub state_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub bot_log_file: Option<PathBuf>,
}

impl PathsConfig {
    /// Watchdog state record, `~/.vpn_monitor_state.json` by default
    pub fn state_file(&self) -> Result<PathBuf, ConfigError> {
        self.resolve(&self.state_file, ".vpn_monitor_state.json")
    }

    /// Watchdog log, `~/.vpn_monitor.log` by default
    pub fn log_file(&self) -> Result<PathBuf, ConfigError> {
        self.resolve(&self.log_file, ".vpn_monitor.log")
    }

    /// Bot log, `~/.vpn_bot.log` by default
    pub fn bot_log_file(&self) -> Result<PathBuf, ConfigError> {
        self.resolve(&self.bot_log_file, ".vpn_bot.log")
    }

    fn resolve(&self, explicit: &Option<PathBuf>, name: &str) -> Result<PathBuf, ConfigError> {
        match explicit {
            Some(path) => Ok(path.clone()),
            None => Ok(toml_config::home_dir()?.join(name)),
        }
    }
}

/// Size-based log rotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Rotate once the active file reaches this size
    pub max_bytes: u64,

    /// Number of rotated files kept (`.1` is the newest)
    pub backups: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            backups: 3,
        }
    }
}

/// Remote-control bot settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// The only Telegram user allowed to issue commands
    pub allowed_user_id: Option<i64>,

    /// Long-polling timeout passed to `getUpdates`
    pub poll_timeout_secs: u64,

    /// Pause after a failed poll
    pub error_pause_secs: u64,

    /// Prefix client and systemctl calls with `sudo`
    pub use_sudo: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            allowed_user_id: None,
            poll_timeout_secs: 30,
            error_pause_secs: 5,
            use_sudo: true,
        }
    }
}
