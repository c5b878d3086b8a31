//! Netbird CLI wrapper
//!
//! Builds the `netbird` subcommand invocations with their timeouts and
//! hands them to the configured [`CommandRunner`].

use crate::config::{CommandTimeouts, NetbirdConfig};
use crate::error::CommandError;
use crate::vpn::process::{CommandOutput, CommandRunner, CommandSpec};
use std::sync::Arc;

/// Thin wrapper over the netbird command-line client
#[derive(Clone)]
pub struct NetbirdCli {
    runner: Arc<dyn CommandRunner>,
    binary: String,
    timeouts: CommandTimeouts,
    use_sudo: bool,
}

impl NetbirdCli {
    /// Create a client that runs `binary` through `runner`
    pub fn new(runner: Arc<dyn CommandRunner>, config: &NetbirdConfig, timeouts: CommandTimeouts) -> Self {
        Self {
            runner,
            binary: config.binary.clone(),
            timeouts,
            use_sudo: false,
        }
    }

    /// Prefix every invocation with `sudo`
    pub fn with_sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }

    /// Whether the client binary can be found on `PATH`
    pub fn is_installed(&self) -> bool {
        which::which(&self.binary).is_ok()
    }

    /// `netbird status`
    pub async fn status(&self) -> Result<CommandOutput, CommandError> {
        self.invoke(&["status"], self.timeouts.status()).await
    }

    /// `netbird status -d`
    pub async fn status_detailed(&self) -> Result<CommandOutput, CommandError> {
        self.invoke(&["status", "-d"], self.timeouts.status()).await
    }

    /// `netbird down`
    pub async fn down(&self) -> Result<CommandOutput, CommandError> {
        self.invoke(&["down"], self.timeouts.up_down()).await
    }

    /// `netbird up`
    pub async fn up(&self) -> Result<CommandOutput, CommandError> {
        self.invoke(&["up"], self.timeouts.up_down()).await
    }

    /// `netbird login`, which prints the SSO URL on builds where `up` does not
    pub async fn login(&self) -> Result<CommandOutput, CommandError> {
        self.invoke(&["login"], self.timeouts.login()).await
    }

    async fn invoke(
        &self,
        args: &[&str],
        timeout: std::time::Duration,
    ) -> Result<CommandOutput, CommandError> {
        let spec = CommandSpec::new(&self.binary, args.iter().copied(), timeout).elevated(self.use_sudo);
        tracing::debug!("Running: {}", spec.command_line());
        self.runner.run(&spec).await
    }
}
