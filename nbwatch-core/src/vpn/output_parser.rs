//! Pattern-based parser for netbird CLI output
//!
//! Recognises connection markers, SSO login prompts and the fields of the
//! detailed status report.

use crate::vpn::state::DetailedStatus;
use regex::Regex;

/// Parser for netbird CLI output
pub struct OutputParser {
    /// Whole-word `connected` / `online`; excludes "Disconnected"
    connected_pattern: Regex,
    /// Device-flow URL carrying a user code
    auth_url_pattern: Regex,
    /// Explicit device endpoint form of the same URL
    device_url_pattern: Regex,
    management_pattern: Regex,
    signal_pattern: Regex,
    peers_pattern: Regex,
    ip_pattern: Regex,
}

impl OutputParser {
    /// Create a new OutputParser with compiled regex patterns
    pub fn new() -> Self {
        Self {
            connected_pattern: Regex::new(r"(?i)\b(?:connected|online)\b")
                .expect("Failed to compile connected pattern"),
            auth_url_pattern: Regex::new(r"(https://\S+user_code=[A-Z0-9-]+)")
                .expect("Failed to compile auth_url pattern"),
            device_url_pattern: Regex::new(r"(https://\S+/device\?user_code=[A-Z0-9-]+)")
                .expect("Failed to compile device_url pattern"),
            management_pattern: Regex::new(r"Management:\s*(\S+)")
                .expect("Failed to compile management pattern"),
            signal_pattern: Regex::new(r"Signal:\s*(\S+)")
                .expect("Failed to compile signal pattern"),
            peers_pattern: Regex::new(r"Peers count:\s*(\S+)")
                .expect("Failed to compile peers pattern"),
            ip_pattern: Regex::new(r"NetBird IP:\s*(\S+)").expect("Failed to compile ip pattern"),
        }
    }

    /// Whether `netbird status` output reports a live connection
    pub fn reports_connected(&self, output: &str) -> bool {
        self.connected_pattern.is_match(output)
    }

    /// Whether `netbird up` output is asking for an SSO login
    pub fn requires_sso(&self, output: &str) -> bool {
        output.contains("SSO login") || output.contains("user_code")
    }

    /// `netbird up` answered that the tunnel is already up
    pub fn already_connected(&self, output: &str) -> bool {
        output.contains("Already connected")
    }

    /// Extract the SSO device login URL, if any
    pub fn extract_auth_url(&self, output: &str) -> Option<String> {
        self.auth_url_pattern
            .captures(output)
            .or_else(|| self.device_url_pattern.captures(output))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Parse `netbird status -d`
    pub fn parse_detailed_status(&self, output: &str) -> DetailedStatus {
        let mut status = DetailedStatus::default();

        if output.contains("NeedsLogin") {
            status.needs_login = true;
            return status;
        }

        let field = |pattern: &Regex| {
            pattern
                .captures(output)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        };

        if let Some(management) = field(&self.management_pattern) {
            status.connected = management.starts_with("Connected");
            status.management = management;
        }
        if let Some(signal) = field(&self.signal_pattern) {
            status.signal = signal;
        }
        if let Some(peers) = field(&self.peers_pattern) {
            status.peers = peers;
        }
        if let Some(ip) = field(&self.ip_pattern) {
            status.ip = ip;
        }

        status
    }
}

impl Default for OutputParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAILED: &str = "\
OS: linux/arm64
Daemon version: 0.28.4
CLI version: 0.28.4
Management: Connected to https://api.netbird.io:443
Signal: Connected to https://signal.netbird.io:443
Relays: 2/2 Available
FQDN: raspberrypi.netbird.cloud
NetBird IP: 100.92.14.7/16
Interface type: Kernel
Quantum resistance: false
Peers count: 5/7 Connected
";

    #[test]
    fn test_reports_connected_word_boundary() {
        let parser = OutputParser::new();
        assert!(parser.reports_connected("Management: Connected\nSignal: Connected"));
        assert!(parser.reports_connected("Daemon status: online"));
        assert!(!parser.reports_connected("Management: Disconnected\nSignal: Disconnected"));
        assert!(!parser.reports_connected("Daemon status: NeedsLogin"));
    }

    #[test]
    fn test_extract_auth_url_from_up_output() {
        let parser = OutputParser::new();
        let output = "Please do the SSO login in your browser.\n\
            If your browser didn't open automatically, use this URL to log in:\n\n\
            https://login.netbird.io/activate?user_code=QWER-TYUI\n";

        assert!(parser.requires_sso(output));
        assert_eq!(
            parser.extract_auth_url(output).as_deref(),
            Some("https://login.netbird.io/activate?user_code=QWER-TYUI")
        );
    }

    #[test]
    fn test_extract_auth_url_device_form() {
        let parser = OutputParser::new();
        let output = "open https://idp.example.com/device?user_code=AB12-CD34 to continue";
        assert_eq!(
            parser.extract_auth_url(output).as_deref(),
            Some("https://idp.example.com/device?user_code=AB12-CD34")
        );
    }

    #[test]
    fn test_no_auth_url_in_plain_output() {
        let parser = OutputParser::new();
        assert!(parser.extract_auth_url("Connected").is_none());
        assert!(!parser.requires_sso("Connected"));
        // Lowercase codes are not the device-flow format
        assert!(parser
            .extract_auth_url("https://x.io/a?user_code=lower")
            .is_none());
    }

    #[test]
    fn test_parse_detailed_status() {
        let status = OutputParser::new().parse_detailed_status(DETAILED);
        assert!(status.connected);
        assert!(!status.needs_login);
        assert_eq!(status.management, "Connected");
        assert_eq!(status.signal, "Connected");
        assert_eq!(status.peers, "5/7");
        assert_eq!(status.ip, "100.92.14.7/16");
    }

    #[test]
    fn test_parse_needs_login_short_circuits() {
        let status =
            OutputParser::new().parse_detailed_status("Daemon status: NeedsLogin\nManagement: Connected");
        assert!(status.needs_login);
        assert!(!status.connected);
        assert_eq!(status.management, "N/A");
    }

    #[test]
    fn test_parse_disconnected_management() {
        let status = OutputParser::new().parse_detailed_status("Management: Disconnected\n");
        assert!(!status.connected);
        assert_eq!(status.management, "Disconnected");
        assert_eq!(status.ip, "N/A");
    }

    #[test]
    fn test_already_connected() {
        let parser = OutputParser::new();
        assert!(parser.already_connected("Already connected"));
        assert!(!parser.already_connected("Connected"));
    }
}
