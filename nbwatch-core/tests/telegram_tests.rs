use nbwatch_core::config::NotificationConfig;
use nbwatch_core::error::NotifyError;
use nbwatch_core::notify::{BotApi, NotificationTransport, TelegramClient};
use nbwatch_core::types::BotToken;
use serde_json::json;
use wiremock::{
    matchers::{body_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

const TOKEN: &str = "42:secret-token";

fn client(server: &MockServer) -> TelegramClient {
    let config = NotificationConfig {
        api_base_url: server.uri(),
        ipv4_only: false,
        ..Default::default()
    };
    TelegramClient::new(BotToken::new(TOKEN.to_string()).unwrap(), &config).unwrap()
}

/// sendMessage posts chat, text and HTML parse mode
#[tokio::test]
async fn test_send_message_acknowledged() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TOKEN)))
        .and(body_json(json!({
            "chat_id": "100",
            "text": "<b>VPN</b> down",
            "parse_mode": "HTML",
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {"message_id": 1}})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client(&mock_server).send_message("100", "<b>VPN</b> down").await;

    assert!(result.is_ok());
}

/// ok:false is an API error carrying the description
#[tokio::test]
async fn test_send_message_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TOKEN)))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found",
        })))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server)
        .send_message("100", "hello")
        .await
        .unwrap_err();

    match err {
        NotifyError::Api { description } => assert!(description.contains("chat not found")),
        other => panic!("unexpected error: {:?}", other),
    }
}

/// Garbage bodies are reported without leaking the token
#[tokio::test]
async fn test_invalid_body_does_not_leak_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TOKEN)))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server)
        .send_message("100", "hello")
        .await
        .unwrap_err();

    assert!(matches!(err, NotifyError::InvalidResponse(_)));
    assert!(!err.to_string().contains("secret-token"));
}

/// getUpdates sends offset, timeout and the message filter
#[tokio::test]
async fn test_get_updates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{}/getUpdates", TOKEN)))
        .and(body_json(json!({
            "offset": 7,
            "timeout": 0,
            "allowed_updates": ["message"],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [
                {
                    "update_id": 7,
                    "message": {
                        "message_id": 3,
                        "from": {"id": 42, "is_bot": false, "username": "operator"},
                        "chat": {"id": 42, "type": "private"},
                        "date": 1748851200,
                        "text": "/vpn_status"
                    }
                },
                {"update_id": 8, "edited_message": {}}
            ]
        })))
        .mount(&mock_server)
        .await;

    let updates = client(&mock_server).get_updates(7, 0).await.unwrap();

    assert_eq!(updates.len(), 2);
    let message = updates[0].message.as_ref().unwrap();
    assert_eq!(message.text.as_deref(), Some("/vpn_status"));
    assert_eq!(message.from.as_ref().map(|u| u.id), Some(42));
    assert_eq!(message.chat.id, 42);
    assert!(updates[1].message.is_none());
}
