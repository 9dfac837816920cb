//! Telegram Bot API client.
//!
//! Every Bot API call answers with the envelope
//! `{"ok": bool, "result": T, "error_code": u16, "description": String}`.
//! A 403 means the bot was blocked, kicked, or the user account is gone,
//! so it maps to `PermissionRevoked`. Every other failure is `Transient`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use herald_common::error::DeliveryError;
use herald_common::types::RecipientId;

use crate::Notifier;

/// Incoming update from `getUpdates`. Only message updates are requested.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// The bot's own account, from `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<u16>,
    description: Option<String>,
}

/// Telegram Bot API client over plain HTTPS.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    /// `{api_url}/bot{token}`
    base_url: String,
    timeout: Duration,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
            timeout,
        })
    }

    /// Send an HTML-formatted message. Returns the new message's id.
    pub async fn send_message(&self, chat: RecipientId, text: &str) -> Result<i64, DeliveryError> {
        let body = json!({
            "chat_id": chat.0,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        let message: Message = self.call("sendMessage", &body, self.timeout).await?;
        Ok(message.message_id)
    }

    pub async fn delete_message(&self, chat: RecipientId, message_id: i64) -> Result<(), DeliveryError> {
        let body = json!({ "chat_id": chat.0, "message_id": message_id });
        let _: bool = self.call("deleteMessage", &body, self.timeout).await?;
        Ok(())
    }

    /// Long-poll for updates after `offset`. Telegram holds the request open
    /// for up to `hold` when nothing is pending.
    pub async fn get_updates(&self, offset: Option<i64>, hold: Duration) -> Result<Vec<Update>, DeliveryError> {
        let body = json!({
            "offset": offset,
            "timeout": hold.as_secs(),
            "allowed_updates": ["message"],
        });
        self.call("getUpdates", &body, hold + self.timeout).await
    }

    /// The bot's own account; its username addresses commands in group chats.
    pub async fn get_me(&self) -> Result<User, DeliveryError> {
        self.call("getMe", &json!({}), self.timeout).await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<T, DeliveryError> {
        // The token is part of the URL; keep it out of error text.
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Transient(e.without_url().to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DeliveryError::Transient(e.without_url().to_string()))?;

        let result = interpret_response(status, &text);
        if let Err(e) = &result {
            tracing::debug!(
                method,
                status = status.as_u16(),
                permission_revoked = e.is_permission_revoked(),
                error = %e,
                "Bot API call failed"
            );
        }
        result
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send(&self, recipient: RecipientId, text: &str) -> Result<(), DeliveryError> {
        self.send_message(recipient, text).await.map(|_| ())
    }
}

/// Decode a Bot API response body, classifying failures.
pub fn interpret_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<T, DeliveryError> {
    let envelope: ApiResponse<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) if status == StatusCode::FORBIDDEN => {
            return Err(DeliveryError::PermissionRevoked(format!("HTTP 403 ({e})")));
        }
        Err(e) => {
            return Err(DeliveryError::Transient(format!(
                "HTTP {}: unreadable response ({e})",
                status.as_u16()
            )));
        }
    };

    if envelope.ok
        && let Some(result) = envelope.result
    {
        return Ok(result);
    }

    let code = envelope.error_code.unwrap_or(status.as_u16());
    let description = envelope
        .description
        .unwrap_or_else(|| "no description".to_string());

    if code == StatusCode::FORBIDDEN.as_u16() {
        Err(DeliveryError::PermissionRevoked(description))
    } else {
        Err(DeliveryError::Transient(format!("{code}: {description}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_send() {
        let body = r#"{"ok":true,"result":{"message_id":77,"chat":{"id":42,"type":"private"},"date":1700000000,"text":"hi"}}"#;
        let message: Message = interpret_response(StatusCode::OK, body).unwrap();
        assert_eq!(message.message_id, 77);
        assert_eq!(message.chat.id, 42);
    }

    #[test]
    fn test_blocked_is_permission_revoked() {
        let body = r#"{"ok":false,"error_code":403,"description":"Forbidden: bot was blocked by the user"}"#;
        let err = interpret_response::<Message>(StatusCode::FORBIDDEN, body).unwrap_err();
        assert_eq!(
            err,
            DeliveryError::PermissionRevoked("Forbidden: bot was blocked by the user".into())
        );
    }

    #[test]
    fn test_forbidden_without_envelope_is_permission_revoked() {
        let err = interpret_response::<Message>(StatusCode::FORBIDDEN, "Forbidden").unwrap_err();
        assert!(err.is_permission_revoked());
    }

    #[test]
    fn test_rate_limit_is_transient() {
        let body = r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 5","parameters":{"retry_after":5}}"#;
        let err = interpret_response::<Message>(StatusCode::TOO_MANY_REQUESTS, body).unwrap_err();
        assert!(!err.is_permission_revoked());
        assert!(err.to_string().contains("429"));
    }

    #[test]
    fn test_bad_request_is_transient() {
        let body = r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#;
        let err = interpret_response::<Message>(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert!(matches!(err, DeliveryError::Transient(_)));
    }

    #[test]
    fn test_gateway_error_page_is_transient() {
        let err = interpret_response::<Message>(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>")
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Transient(_)));
    }

    #[test]
    fn test_updates_with_non_text_messages() {
        let body = r#"{"ok":true,"result":[
            {"update_id":10,"message":{"message_id":1,"chat":{"id":5,"type":"private"},"date":0,"text":"/start"}},
            {"update_id":11,"message":{"message_id":2,"chat":{"id":5,"type":"private"},"date":0,"sticker":{}}},
            {"update_id":12,"edited_message":{"message_id":1,"chat":{"id":5,"type":"private"},"date":0,"text":"x"}}
        ]}"#;
        let updates: Vec<Update> = interpret_response(StatusCode::OK, body).unwrap();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0].message.as_ref().unwrap().text.as_deref(), Some("/start"));
        assert!(updates[1].message.as_ref().unwrap().text.is_none());
        assert!(updates[2].message.is_none());
    }

    #[test]
    fn test_get_me_username() {
        let body = r#"{"ok":true,"result":{"id":99,"is_bot":true,"first_name":"Herald","username":"HeraldBot"}}"#;
        let me: User = interpret_response(StatusCode::OK, body).unwrap();
        assert_eq!(me.id, 99);
        assert_eq!(me.username.as_deref(), Some("HeraldBot"));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_transient_and_hides_token() {
        let client =
            TelegramClient::new("http://127.0.0.1:9", "123456:SECRET", Duration::from_secs(2)).unwrap();
        let err = client.send(RecipientId(1), "hello").await.unwrap_err();
        assert!(matches!(err, DeliveryError::Transient(_)));
        assert!(!err.to_string().contains("SECRET"));
    }
}
