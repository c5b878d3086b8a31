//! Status-change notifications with bounded retry
//!
//! The notifier keeps retrying delivery with exponential backoff until the
//! transport acknowledges the message or the wall-clock budget runs out.
//! It reports the outcome as a boolean and never returns an error.

use crate::clock::{elapsed_secs, Clock};
use crate::error::NotifyError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub mod message;
pub mod telegram;

pub use message::Notification;
pub use telegram::{TelegramClient, Update};

/// Delivers a single chat message
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// `Ok` only when the API acknowledged the message with `ok: true`
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), NotifyError>;
}

/// Transport that can also receive commands through long polling
#[async_trait]
pub trait BotApi: NotificationTransport {
    async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, NotifyError>;
}

/// Retry budget and backoff for notification delivery
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NotifyPolicy {
    /// Stop retrying once this much time has passed since the first attempt
    #[serde(default = "default_max_elapsed")]
    pub max_elapsed_secs: u64,

    /// Pause after the first failed attempt
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: f64,

    /// Growth factor of the pause
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Cap of the pause
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: f64,
}

fn default_max_elapsed() -> u64 {
    900
}
fn default_initial_delay() -> f64 {
    10.0
}
fn default_backoff_multiplier() -> f64 {
    1.5
}
fn default_max_delay() -> f64 {
    60.0
}

impl Default for NotifyPolicy {
    fn default() -> Self {
        Self {
            max_elapsed_secs: default_max_elapsed(),
            initial_delay_secs: default_initial_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_secs: default_max_delay(),
        }
    }
}

impl NotifyPolicy {
    /// Validate the policy
    pub fn validate(&self) -> Result<(), NotifyPolicyError> {
        if self.max_elapsed_secs == 0 {
            return Err(NotifyPolicyError::ZeroBudget);
        }
        if !(self.initial_delay_secs > 0.0) {
            return Err(NotifyPolicyError::InvalidInitialDelay(self.initial_delay_secs));
        }
        if !(self.backoff_multiplier >= 1.0) {
            return Err(NotifyPolicyError::InvalidMultiplier(self.backoff_multiplier));
        }
        if !(self.max_delay_secs >= self.initial_delay_secs) {
            return Err(NotifyPolicyError::MaxDelayLessThanInitial(
                self.max_delay_secs,
                self.initial_delay_secs,
            ));
        }
        if !(self.max_delay_secs <= MAX_RETRY_DELAY_SECS) {
            return Err(NotifyPolicyError::MaxDelayTooLarge(self.max_delay_secs));
        }
        Ok(())
    }

    /// Pause following `current`: multiplied, then capped
    pub fn next_delay(&self, current: f64) -> f64 {
        (current * self.backoff_multiplier).min(self.max_delay_secs)
    }
}

/// Upper bound for a single retry pause
pub const MAX_RETRY_DELAY_SECS: f64 = 3600.0;

/// Validation errors for NotifyPolicy
#[derive(Debug, thiserror::Error)]
pub enum NotifyPolicyError {
    #[error("max_elapsed_secs cannot be zero")]
    ZeroBudget,

    #[error("initial_delay_secs must be positive, got: {0}")]
    InvalidInitialDelay(f64),

    #[error("backoff_multiplier must be at least 1, got: {0}")]
    InvalidMultiplier(f64),

    #[error("max_delay_secs ({0}) must be >= initial_delay_secs ({1})")]
    MaxDelayLessThanInitial(f64, f64),

    #[error("max_delay_secs cannot exceed 3600, got: {0}")]
    MaxDelayTooLarge(f64),
}

/// Sends messages to the configured chat
pub struct Notifier {
    transport: Option<Arc<dyn NotificationTransport>>,
    chat_id: Option<String>,
    clock: Arc<dyn Clock>,
    policy: NotifyPolicy,
}

impl Notifier {
    pub fn new(
        transport: Option<Arc<dyn NotificationTransport>>,
        chat_id: Option<String>,
        clock: Arc<dyn Clock>,
        policy: NotifyPolicy,
    ) -> Self {
        Self {
            transport,
            chat_id,
            clock,
            policy,
        }
    }

    /// Deliver `message`, retrying within the policy budget
    ///
    /// Returns `true` once the transport acknowledges delivery and `false`
    /// when credentials are missing or the budget is exhausted.
    #[tracing::instrument(skip_all, fields(budget_secs = self.policy.max_elapsed_secs))]
    pub async fn notify(&self, message: &str) -> bool {
        let (transport, chat_id) = match (&self.transport, &self.chat_id) {
            (Some(transport), Some(chat_id)) => (transport, chat_id),
            _ => {
                warn!("Telegram credentials are not configured, notification skipped");
                return false;
            }
        };

        let started = self.clock.now();
        let budget = self.policy.max_elapsed_secs as f64;
        let mut delay = self.policy.initial_delay_secs;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            if elapsed_secs(started, self.clock.now()) > budget {
                error!(
                    "Notification delivery budget ({}s) exceeded after {} attempts",
                    self.policy.max_elapsed_secs,
                    attempt - 1
                );
                return false;
            }

            match transport.send_message(chat_id, message).await {
                Ok(()) => {
                    if attempt > 1 {
                        info!("Telegram notification sent on attempt {}", attempt);
                    } else {
                        info!("Telegram notification sent");
                    }
                    return true;
                }
                Err(NotifyError::Api { description }) => {
                    warn!("Telegram API error: {}", description);
                }
                Err(e) => {
                    warn!(
                        "Attempt {}: {}, retrying in {:.1}s",
                        attempt, e, delay
                    );
                }
            }

            self.clock.sleep(Duration::from_secs_f64(delay)).await;
            delay = self.policy.next_delay(delay);
        }
    }
}
