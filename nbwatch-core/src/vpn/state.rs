//! VPN connectivity state
//!
//! Defines the persisted connectivity states and the detailed client
//! status shown to operators.

use serde::{Deserialize, Serialize};

/// Connectivity as last observed by the watchdog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityState {
    /// Client reports connected and internal hosts answer
    Connected,

    /// Tunnel down, reconnect did not help
    Disconnected,

    /// Session token expired, a human has to open the SSO link
    AuthRequired,

    /// No run has been recorded yet
    #[default]
    Unknown,
}

impl ConnectivityState {
    /// True for the two states a recovery is reported from
    pub fn is_down(&self) -> bool {
        matches!(self, Self::Disconnected | Self::AuthRequired)
    }
}

impl std::fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectivityState::Connected => write!(f, "connected"),
            ConnectivityState::Disconnected => write!(f, "disconnected"),
            ConnectivityState::AuthRequired => write!(f, "auth_required"),
            ConnectivityState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Fields extracted from `netbird status -d`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailedStatus {
    /// Management server reports `Connected`
    pub connected: bool,

    /// Daemon is waiting for an interactive login
    pub needs_login: bool,

    pub management: String,
    pub signal: String,
    pub peers: String,
    pub ip: String,
}

impl Default for DetailedStatus {
    fn default() -> Self {
        let na = || "N/A".to_string();
        Self {
            connected: false,
            needs_login: false,
            management: na(),
            signal: na(),
            peers: na(),
            ip: na(),
        }
    }
}

/// Operator-facing summary combining client status and reachability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLabel {
    Connected,
    AuthRequired,
    Disconnected,
}

impl StatusLabel {
    /// Connected needs both the management link and a ping reply
    pub fn from_status(status: &DetailedStatus, reachable: bool) -> Self {
        if status.connected && reachable {
            Self::Connected
        } else if status.needs_login {
            Self::AuthRequired
        } else {
            Self::Disconnected
        }
    }
}

impl std::fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusLabel::Connected => write!(f, "Connected"),
            StatusLabel::AuthRequired => write!(f, "Authorization required"),
            StatusLabel::Disconnected => write!(f, "Disconnected"),
        }
    }
}
