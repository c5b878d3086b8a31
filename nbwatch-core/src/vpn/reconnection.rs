//! VPN reconnection by cycling the netbird client
//!
//! This module provides ReconnectController, which runs a bounded number of
//! `down` / `up` cycles and tells an ordinary failure apart from an expired
//! session that needs an interactive SSO login.

use crate::clock::Clock;
use crate::vpn::cli_connector::NetbirdCli;
use crate::vpn::health_check::StatusProber;
use crate::vpn::output_parser::OutputParser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Configuration for the reconnect loop
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReconnectPolicy {
    /// Number of down/up cycles before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause after `down` so the teardown settles
    #[serde(default = "default_teardown_pause")]
    pub teardown_pause_secs: u64,

    /// Pause after `up` before probing again
    #[serde(default = "default_establish_pause")]
    pub establish_pause_secs: u64,

    /// Pause between failed attempts
    #[serde(default = "default_retry_pause")]
    pub retry_pause_secs: u64,
}

fn default_max_retries() -> u32 {
    3
}
fn default_teardown_pause() -> u64 {
    2
}
fn default_establish_pause() -> u64 {
    5
}
fn default_retry_pause() -> u64 {
    3
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            teardown_pause_secs: default_teardown_pause(),
            establish_pause_secs: default_establish_pause(),
            retry_pause_secs: default_retry_pause(),
        }
    }
}

impl ReconnectPolicy {
    /// Validate the entire policy
    ///
    /// # Returns
    ///
    /// * `Ok(())` if all fields are valid
    /// * `Err(PolicyValidationError)` with the first validation error encountered
    pub fn validate(&self) -> Result<(), PolicyValidationError> {
        if self.max_retries < 1 || self.max_retries > 10 {
            return Err(PolicyValidationError::InvalidMaxRetries(self.max_retries));
        }

        for (name, value) in [
            ("teardown_pause_secs", self.teardown_pause_secs),
            ("establish_pause_secs", self.establish_pause_secs),
            ("retry_pause_secs", self.retry_pause_secs),
        ] {
            if value > 300 {
                return Err(PolicyValidationError::PauseTooLong {
                    field: name.to_string(),
                    value,
                });
            }
        }

        Ok(())
    }

    /// Upper bound on the time spent pausing inside one `reconnect` call
    pub fn max_pause_total(&self) -> Duration {
        let per_attempt = self.teardown_pause_secs + self.establish_pause_secs;
        let between = self.retry_pause_secs * u64::from(self.max_retries.saturating_sub(1));
        Duration::from_secs(per_attempt * u64::from(self.max_retries) + between)
    }
}

/// Result of a reconnect run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectOutcome {
    /// The tunnel is up again
    pub succeeded: bool,

    /// Attempt that ended the run (1-indexed)
    pub attempt_number: u32,

    /// SSO link when the session has to be renewed by a human
    pub auth_url: Option<String>,
}

impl ReconnectOutcome {
    fn success(attempt_number: u32) -> Self {
        Self {
            succeeded: true,
            attempt_number,
            auth_url: None,
        }
    }

    fn failure(attempt_number: u32, auth_url: Option<String>) -> Self {
        Self {
            succeeded: false,
            attempt_number,
            auth_url,
        }
    }

    /// Failed because the client needs an interactive login
    pub fn needs_auth(&self) -> bool {
        !self.succeeded && self.auth_url.is_some()
    }
}

/// Drives the down/up cycle
#[derive(Clone)]
pub struct ReconnectController {
    cli: NetbirdCli,
    prober: StatusProber,
    parser: Arc<OutputParser>,
    clock: Arc<dyn Clock>,
    policy: ReconnectPolicy,
}

impl ReconnectController {
    pub fn new(
        cli: NetbirdCli,
        prober: StatusProber,
        parser: Arc<OutputParser>,
        clock: Arc<dyn Clock>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            cli,
            prober,
            parser,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Reconnect with the configured retry count
    pub async fn reconnect_default(&self) -> ReconnectOutcome {
        self.reconnect(self.policy.max_retries).await
    }

    /// Cycle the client down/up at most `max_retries` times
    ///
    /// Stops at the first attempt after which the probe passes, or as soon as
    /// `up` prints an SSO login URL. When every attempt fails without such a
    /// URL, `netbird login` is asked once for it.
    #[tracing::instrument(skip(self))]
    pub async fn reconnect(&self, max_retries: u32) -> ReconnectOutcome {
        for attempt in 1..=max_retries {
            info!("Reconnection attempt {}/{}", attempt, max_retries);

            match self.cycle(attempt).await {
                AttemptResult::Connected => {
                    info!("VPN reconnected (attempt {})", attempt);
                    return ReconnectOutcome::success(attempt);
                }
                AttemptResult::AuthRequired(url) => {
                    warn!("SSO authorization required: {}", url);
                    return ReconnectOutcome::failure(attempt, Some(url));
                }
                AttemptResult::Failed => {}
            }

            if attempt < max_retries {
                self.pause(self.policy.retry_pause_secs).await;
            }
        }

        error!("Failed to reconnect VPN after {} attempts", max_retries);

        let auth_url = self.fetch_auth_url().await;
        if let Some(ref url) = auth_url {
            warn!("Obtained SSO URL: {}", url);
        }

        ReconnectOutcome::failure(max_retries, auth_url)
    }

    /// Ask `netbird login` for a fresh SSO URL
    pub async fn fetch_auth_url(&self) -> Option<String> {
        info!("Requesting SSO URL via netbird login");

        match self.cli.login().await {
            Ok(output) => self.parser.extract_auth_url(&output.combined()),
            Err(e) => {
                warn!("Could not obtain auth URL: {}", e);
                None
            }
        }
    }

    async fn cycle(&self, attempt: u32) -> AttemptResult {
        match self.cli.down().await {
            Ok(output) if !output.success() => {
                warn!(
                    "netbird down exited with {:?}: {}",
                    output.exit_code,
                    output.stderr.trim()
                );
            }
            Ok(_) => {}
            Err(e) => {
                error!("netbird down failed (attempt {}): {}", attempt, e);
                return AttemptResult::Failed;
            }
        }

        self.pause(self.policy.teardown_pause_secs).await;

        let up = match self.cli.up().await {
            Ok(output) => output,
            Err(e) => {
                error!("netbird up failed (attempt {}): {}", attempt, e);
                return AttemptResult::Failed;
            }
        };

        let combined = up.combined();
        if self.parser.requires_sso(&combined) {
            if let Some(url) = self.parser.extract_auth_url(&combined) {
                return AttemptResult::AuthRequired(url);
            }
        }

        if !up.success() {
            warn!(
                "netbird up exited with {:?}: {}",
                up.exit_code,
                up.stderr.trim()
            );
            return AttemptResult::Failed;
        }

        info!("Waiting for the connection to establish");
        self.pause(self.policy.establish_pause_secs).await;

        if self.prober.is_connected().await {
            AttemptResult::Connected
        } else {
            warn!("VPN still down after attempt {}", attempt);
            AttemptResult::Failed
        }
    }

    async fn pause(&self, secs: u64) {
        if secs > 0 {
            self.clock.sleep(Duration::from_secs(secs)).await;
        }
    }
}

enum AttemptResult {
    Connected,
    AuthRequired(String),
    Failed,
}

/// Validation errors for ReconnectPolicy
#[derive(Debug, thiserror::Error)]
pub enum PolicyValidationError {
    #[error("max_retries must be between 1 and 10, got: {0}")]
    InvalidMaxRetries(u32),

    #[error("{field} must be at most 300 seconds, got: {value}")]
    PauseTooLong { field: String, value: u64 },
}
