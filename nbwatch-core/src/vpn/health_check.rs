//! VPN connectivity probing
//!
//! A tunnel counts as up only when the client reports a connection AND at
//! least one internal host answers a ping. The client alone can claim
//! "connected" while nothing routes.

use crate::config::{CommandTimeouts, ProbeConfig};
use crate::error::CommandError;
use crate::vpn::cli_connector::NetbirdCli;
use crate::vpn::output_parser::OutputParser;
use crate::vpn::process::{CommandRunner, CommandSpec};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Result of one probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    /// `netbird status` succeeded and reported a connection
    pub client_ok: bool,

    /// Some internal host answered
    pub reachable: bool,
}

impl ProbeResult {
    pub fn is_connected(&self) -> bool {
        self.client_ok && self.reachable
    }
}

/// Combines the client status check with ping reachability
#[derive(Clone)]
pub struct StatusProber {
    cli: NetbirdCli,
    runner: Arc<dyn CommandRunner>,
    parser: Arc<OutputParser>,
    hosts: Vec<String>,
    ping_wait_secs: u32,
    timeouts: CommandTimeouts,
}

impl StatusProber {
    pub fn new(
        cli: NetbirdCli,
        runner: Arc<dyn CommandRunner>,
        parser: Arc<OutputParser>,
        probe: &ProbeConfig,
        timeouts: CommandTimeouts,
    ) -> Self {
        Self {
            cli,
            runner,
            parser,
            hosts: probe.hosts.clone(),
            ping_wait_secs: probe.ping_wait_secs,
            timeouts,
        }
    }

    /// Run both checks; both always execute so each is logged
    #[tracing::instrument(skip(self))]
    pub async fn probe(&self) -> ProbeResult {
        let client_ok = self.check_client_status().await;
        let reachable = self.check_reachability().await;

        debug!(client_ok, reachable, "VPN check");
        ProbeResult {
            client_ok,
            reachable,
        }
    }

    /// Overall connectivity verdict
    pub async fn is_connected(&self) -> bool {
        self.probe().await.is_connected()
    }

    /// Ask the client whether it is connected; never fails
    pub async fn check_client_status(&self) -> bool {
        match self.cli.status().await {
            Ok(output) if output.success() => self.parser.reports_connected(&output.stdout),
            Ok(output) => {
                debug!(exit_code = ?output.exit_code, "netbird status returned non-zero");
                false
            }
            Err(e @ CommandError::Timeout { .. }) => {
                warn!("Netbird status check failed: {}", e);
                false
            }
            Err(e) => {
                error!("Netbird status check failed: {}", e);
                false
            }
        }
    }

    /// Ping the internal hosts in order, stopping at the first reply
    pub async fn check_reachability(&self) -> bool {
        for host in &self.hosts {
            let wait = self.ping_wait_secs.to_string();
            let spec = CommandSpec::new(
                "ping",
                ["-c", "1", "-W", wait.as_str(), host.as_str()],
                self.timeouts.ping(),
            );

            match self.runner.run(&spec).await {
                Ok(output) if output.success() => {
                    debug!(host = %host, "Ping succeeded");
                    return true;
                }
                Ok(_) => debug!(host = %host, "Ping got no reply"),
                Err(e) => debug!(host = %host, error = %e, "Ping failed"),
            }
        }

        false
    }
}
