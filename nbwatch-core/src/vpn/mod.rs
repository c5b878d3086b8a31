//! VPN client module
//!
//! Handles netbird CLI integration, connectivity probing and reconnection.

pub mod cli_connector;
pub mod output_parser;
pub mod process;
pub mod state;

// Connectivity probing and automatic reconnection
pub mod health_check;
pub mod reconnection;

// Public re-exports
pub use cli_connector::NetbirdCli;
pub use health_check::{ProbeResult, StatusProber};
pub use output_parser::OutputParser;
pub use process::{CommandOutput, CommandRunner, CommandSpec, SystemCommandRunner};
pub use reconnection::{ReconnectController, ReconnectOutcome, ReconnectPolicy};
pub use state::{ConnectivityState, DetailedStatus, StatusLabel};
