//! Notification texts
//!
//! Messages are Telegram HTML; dynamic parts are escaped.

use chrono::{DateTime, Local};

/// Status changes reported to the chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Tunnel lost, reconnect about to start
    Disconnect,

    /// Reconnect loop brought the tunnel back
    ReconnectSuccess { attempt: u32, max_attempts: u32 },

    /// Reconnect loop gave up
    ReconnectFailure { attempts: u32 },

    /// Session expired, operator must open the link
    AuthRequired { auth_url: String },

    /// Tunnel came back without our intervention
    Recovered,
}

impl Notification {
    /// Short identifier used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Disconnect => "disconnect",
            Notification::ReconnectSuccess { .. } => "reconnect_success",
            Notification::ReconnectFailure { .. } => "reconnect_failure",
            Notification::AuthRequired { .. } => "auth_required",
            Notification::Recovered => "recovered",
        }
    }

    /// Reports a return to `connected`; these bypass the cooldown
    pub fn is_recovery(&self) -> bool {
        matches!(
            self,
            Notification::ReconnectSuccess { .. } | Notification::Recovered
        )
    }

    /// Render the HTML message text
    pub fn render(&self, at: DateTime<Local>) -> String {
        let now = at.format("%d.%m.%Y %H:%M:%S");

        match self {
            Notification::Disconnect => format!(
                "⚠️ <b>VPN disconnected</b>\n\n\
                 Netbird VPN is unreachable\n\
                 Time: {now}\n\
                 Trying to reconnect..."
            ),
            Notification::ReconnectSuccess {
                attempt,
                max_attempts,
            } => format!(
                "✅ <b>VPN restored</b>\n\n\
                 Netbird reconnected\n\
                 Attempt: {attempt}/{max_attempts}\n\
                 Time: {now}"
            ),
            Notification::ReconnectFailure { attempts } => format!(
                "❌ <b>VPN reconnect failed</b>\n\n\
                 Could not restore Netbird\n\
                 Attempts: {attempts}/{attempts}\n\
                 Time: {now}\n\n\
                 Manual intervention required!"
            ),
            Notification::AuthRequired { auth_url } => format!(
                "🔐 <b>VPN needs authorization</b>\n\n\
                 The Netbird session token has expired.\n\
                 Time: {now}\n\n\
                 <b>Open this link to log in:</b>\n\
                 {}",
                escape_html(auth_url)
            ),
            Notification::Recovered => format!(
                "✅ <b>VPN recovered on its own</b>\n\n\
                 Netbird VPN is reachable again\n\
                 Time: {now}"
            ),
        }
    }
}

/// Escape the three characters Telegram HTML treats specially
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 2, 8, 5, 9).unwrap()
    }

    #[test]
    fn test_render_includes_timestamp() {
        let text = Notification::Disconnect.render(at());
        assert!(text.contains("02.06.2025 08:05:09"));
        assert!(text.contains("<b>VPN disconnected</b>"));
    }

    #[test]
    fn test_render_reconnect_success_attempts() {
        let text = Notification::ReconnectSuccess {
            attempt: 2,
            max_attempts: 3,
        }
        .render(at());
        assert!(text.contains("Attempt: 2/3"));
    }

    #[test]
    fn test_auth_url_is_escaped() {
        let text = Notification::AuthRequired {
            auth_url: "https://idp.example.com/device?user_code=AB-12&x=<y>".to_string(),
        }
        .render(at());

        assert!(text.contains("user_code=AB-12&amp;x=&lt;y&gt;"));
    }

    #[test]
    fn test_recovery_kinds() {
        assert!(Notification::Recovered.is_recovery());
        assert!(Notification::ReconnectSuccess {
            attempt: 1,
            max_attempts: 3
        }
        .is_recovery());
        assert!(!Notification::Disconnect.is_recovery());
        assert!(!Notification::ReconnectFailure { attempts: 3 }.is_recovery());
        assert_eq!(Notification::Recovered.kind(), "recovered");
    }

    #[test]
    fn test_escape_html_plain_text_unchanged() {
        assert_eq!(escape_html("plain text"), "plain text");
    }
}
