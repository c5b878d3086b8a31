//! Type definitions and wrappers for secure data handling
//!
//! The Telegram bot token grants full control of the bot, so it is wrapped
//! with the secrecy crate to keep it out of logs and debug output.

use secrecy::{ExposeSecret, Secret};

/// Environment variable holding the Telegram bot token
pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
/// Environment variable holding the watchdog's chat id
pub const ENV_MONITOR_CHAT_ID: &str = "VPN_MONITOR_CHAT_ID";
/// Fallback chat id shared with the other reporting jobs
pub const ENV_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
/// Environment variable holding the Telegram user allowed to drive the bot
pub const ENV_BOT_ALLOWED_USER: &str = "VPN_BOT_ALLOWED_USER_ID";

/// Wrapper for the Telegram bot token
///
/// The token is embedded in every API URL; `Debug` never prints it.
#[derive(Clone, Debug)]
pub struct BotToken(Secret<String>);

impl BotToken {
    /// Create a new token, rejecting blank values
    pub fn new(token: String) -> Option<Self> {
        let token = token.trim().to_string();
        if token.is_empty() {
            None
        } else {
            Some(Self(Secret::new(token)))
        }
    }

    /// Expose the token value (use with caution!)
    ///
    /// This should only be called when building the API request URL.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Credentials for the Telegram transport, resolved from the environment
#[derive(Clone, Debug, Default)]
pub struct TelegramCredentials {
    /// Bot token, absent when notifications are disabled
    pub bot_token: Option<BotToken>,

    /// Destination chat for watchdog notifications
    pub chat_id: Option<String>,
}

impl TelegramCredentials {
    /// Resolve credentials through a lookup such as `std::env::var`
    ///
    /// `VPN_MONITOR_CHAT_ID` takes precedence over the shared `TELEGRAM_CHAT_ID`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            bot_token: lookup(ENV_BOT_TOKEN).and_then(BotToken::new),
            chat_id: non_blank(ENV_MONITOR_CHAT_ID)
                .or_else(|| non_blank(ENV_CHAT_ID))
                .map(|v| v.trim().to_string()),
        }
    }

    /// True when both the token and the chat id are present
    pub fn is_complete(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_monitor_chat_id_takes_precedence() {
        let creds = TelegramCredentials::from_lookup(lookup_from(&[
            (ENV_BOT_TOKEN, "123:abc"),
            (ENV_MONITOR_CHAT_ID, "-100200"),
            (ENV_CHAT_ID, "-100300"),
        ]));

        assert_eq!(creds.chat_id.as_deref(), Some("-100200"));
        assert!(creds.is_complete());
    }

    #[test]
    fn test_falls_back_to_shared_chat_id() {
        let creds = TelegramCredentials::from_lookup(lookup_from(&[
            (ENV_BOT_TOKEN, "123:abc"),
            (ENV_MONITOR_CHAT_ID, "  "),
            (ENV_CHAT_ID, "-100300"),
        ]));

        assert_eq!(creds.chat_id.as_deref(), Some("-100300"));
    }

    #[test]
    fn test_blank_token_is_absent() {
        let creds = TelegramCredentials::from_lookup(lookup_from(&[(ENV_BOT_TOKEN, "")]));
        assert!(creds.bot_token.is_none());
        assert!(!creds.is_complete());
    }

    #[test]
    fn test_token_not_in_debug_output() {
        let token = BotToken::new("123456:SECRET".to_string()).unwrap();
        assert!(!format!("{:?}", token).contains("SECRET"));
        assert_eq!(token.expose(), "123456:SECRET");
    }
}
