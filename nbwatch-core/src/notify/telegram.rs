//! Telegram Bot API client
//!
//! Implements both the outbound notification transport and the
//! long-polling side used by the remote-control bot.

use crate::config::NotificationConfig;
use crate::error::NotifyError;
use crate::notify::{BotApi, NotificationTransport};
use crate::types::BotToken;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Every message is sent as HTML
pub const PARSE_MODE: &str = "HTML";

/// Envelope of every Bot API response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(default)]
    pub description: Option<String>,
    pub result: Option<T>,
}

/// One entry of a `getUpdates` result
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

/// Incoming chat message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

/// Message author
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

/// Conversation the message belongs to
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Serialize)]
struct GetUpdates<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

/// HTTP client for the Bot API
pub struct TelegramClient {
    client: Client,
    base_url: String,
    token: BotToken,
}

impl TelegramClient {
    /// Build a client for `token`
    ///
    /// With `ipv4_only` the socket is bound to `0.0.0.0`, so connections only
    /// go out over IPv4 even where AAAA records resolve but do not route.
    pub fn new(token: BotToken, config: &NotificationConfig) -> Result<Self, NotifyError> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .use_rustls_tls();

        if config.ipv4_only {
            builder = builder.local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        }

        let client = builder.build().map_err(|e| NotifyError::Http(e.without_url()))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token.expose(), method)
    }

    /// Decode a response body, keeping the token-bearing URL out of errors
    async fn decode<T>(response: reqwest::Response) -> Result<ApiResponse<T>, NotifyError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NotifyError::Http(e.without_url()))?;

        serde_json::from_str(&body).map_err(|e| {
            NotifyError::InvalidResponse(format!("HTTP {}: {}", status, e))
        })
    }
}

#[async_trait]
impl NotificationTransport for TelegramClient {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let payload = SendMessage {
            chat_id,
            text,
            parse_mode: PARSE_MODE,
        };

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.without_url()))?;

        let api: ApiResponse<serde_json::Value> = Self::decode(response).await?;
        if api.ok {
            Ok(())
        } else {
            Err(NotifyError::Api {
                description: api
                    .description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            })
        }
    }
}

#[async_trait]
impl BotApi for TelegramClient {
    async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, NotifyError> {
        let payload = GetUpdates {
            offset,
            timeout: timeout_secs,
            allowed_updates: &["message"],
        };

        let response = self
            .client
            .post(self.method_url("getUpdates"))
            .json(&payload)
            .timeout(Duration::from_secs(timeout_secs + 10))
            .send()
            .await
            .map_err(|e| NotifyError::Http(e.without_url()))?;

        let api: ApiResponse<Vec<Update>> = Self::decode(response).await?;
        if api.ok {
            Ok(api.result.unwrap_or_default())
        } else {
            Err(NotifyError::Api {
                description: api
                    .description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_deserializes_without_message() {
        let updates: ApiResponse<Vec<Update>> = serde_json::from_str(
            r#"{"ok":true,"result":[{"update_id":7,"edited_message":{}}]}"#,
        )
        .unwrap();

        let result = updates.result.unwrap();
        assert_eq!(result[0].update_id, 7);
        assert!(result[0].message.is_none());
    }

    #[test]
    fn test_error_envelope() {
        let api: ApiResponse<serde_json::Value> = serde_json::from_str(
            r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
        )
        .unwrap();

        assert!(!api.ok);
        assert_eq!(api.description.as_deref(), Some("Bad Request: chat not found"));
        assert!(api.result.is_none());
    }

    #[test]
    fn test_method_url_trims_trailing_slash() {
        let config = NotificationConfig {
            api_base_url: "http://127.0.0.1:8081/".to_string(),
            ipv4_only: false,
            ..Default::default()
        };
        let token = BotToken::new("42:abc".to_string()).unwrap();
        let client = TelegramClient::new(token, &config).unwrap();

        assert_eq!(
            client.method_url("sendMessage"),
            "http://127.0.0.1:8081/bot42:abc/sendMessage"
        );
    }
}
