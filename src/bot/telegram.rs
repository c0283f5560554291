//! Telegram Bot API client.
//!
//! API: https://api.telegram.org
//! Auth: bot token in the URL path.
//!
//! Hand-rolled client for the handful of methods the bot needs:
//! long-polling `getUpdates`, `sendMessage` (HTML parse mode),
//! `editMessageText` and `deleteMessage`. The outbound methods sit
//! behind the [`Notifier`] trait so handlers and sweeps stay testable;
//! messages carry the persistent reply-keyboard main menu.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

const API_BASE: &str = "https://api.telegram.org";

/// Rows of the persistent reply keyboard shown under the input box.
const MAIN_MENU: &[&[&str]] = &[
    &["/liquiditychart", "/notifyblocks", "/status"],
    &["/stopblocks", "/help"],
];

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors at the Telegram API boundary.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// The API answered with `ok: false`.
    #[error("Telegram API rejected the call: {description}")]
    Api { description: String },

    /// Transport or deserialization failure below the API.
    #[error("Telegram transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<T>,
}

/// One incoming update from `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

/// An incoming chat message, the only update payload the bot reads.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// A message the bot has sent; only the id matters, for later edits.
#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}

// ---------------------------------------------------------------------------
// Outbound delivery
// ---------------------------------------------------------------------------

/// Outbound side of the Telegram API.
///
/// The bot handlers and the watcher sweeps send through this trait
/// instead of the concrete client, so tests can drive them against a
/// recording notifier with no network.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send an HTML-formatted message with the main-menu keyboard.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<SentMessage, TelegramError>;

    /// Edit a previously sent message in place.
    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), TelegramError>;

    /// Delete a message (used for progress placeholders).
    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), TelegramError>;
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    /// `https://api.telegram.org/bot<token>`
    base: String,
}

impl TelegramClient {
    /// The HTTP timeout must sit above the long-poll window, or every
    /// quiet poll would surface as a transport error.
    pub fn new(token: &str) -> Result<Self, TelegramError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(70))
            .user_agent("lnhelper/0.1.0")
            .build()?;
        Ok(Self {
            http,
            base: format!("{API_BASE}/bot{token}"),
        })
    }

    /// Long-poll for updates with ids at or above `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let body = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        self.call("getUpdates", body).await
    }

    // -- Internal helpers ---------------------------------------------------

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, TelegramError> {
        let url = format!("{}/{method}", self.base);
        let resp = self.http.post(&url).json(&body).send().await?;
        let envelope: ApiResponse<T> = resp.json().await?;

        if !envelope.ok {
            return Err(TelegramError::Api {
                description: envelope
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }
        envelope.result.ok_or_else(|| TelegramError::Api {
            description: "response carried no result".to_string(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<SentMessage, TelegramError> {
        debug!(chat_id, "Sending message");
        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "reply_markup": main_menu_markup(),
        });
        self.call("sendMessage", body).await
    }

    async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), TelegramError> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "HTML",
        });
        // The API returns the edited message or `true`; neither matters.
        let _: serde_json::Value = self.call("editMessageText", body).await?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), TelegramError> {
        let body = json!({
            "chat_id": chat_id,
            "message_id": message_id,
        });
        let _: bool = self.call("deleteMessage", body).await?;
        Ok(())
    }
}

fn main_menu_markup() -> serde_json::Value {
    json!({
        "keyboard": MAIN_MENU,
        "resize_keyboard": true,
    })
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use test_support::MockNotifier;

#[cfg(test)]
mod test_support {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::{Notifier, SentMessage, TelegramError};

    /// In-memory notifier that records every send.
    ///
    /// All state is behind mutexes so tests can share it across tasks.
    /// Delivery fails while a forced error is set.
    pub struct MockNotifier {
        sent: Mutex<Vec<(i64, String)>>,
        /// If set, all deliveries return this error.
        force_error: Mutex<Option<String>>,
    }

    impl MockNotifier {
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                force_error: Mutex::new(None),
            })
        }

        /// Force all subsequent deliveries to fail with `msg`.
        pub fn set_error(&self, msg: &str) {
            *self.force_error.lock().unwrap() = Some(msg.to_string());
        }

        /// Clear any forced error.
        pub fn clear_error(&self) {
            *self.force_error.lock().unwrap() = None;
        }

        /// Every `(chat_id, text)` delivered so far, in send order.
        pub fn sent(&self) -> Vec<(i64, String)> {
            self.sent.lock().unwrap().clone()
        }

        fn check_error(&self) -> Result<(), TelegramError> {
            if let Some(msg) = self.force_error.lock().unwrap().as_ref() {
                return Err(TelegramError::Api { description: msg.clone() });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Notifier for MockNotifier {
        async fn send_message(
            &self,
            chat_id: i64,
            text: &str,
        ) -> Result<SentMessage, TelegramError> {
            self.check_error()?;
            let mut sent = self.sent.lock().unwrap();
            sent.push((chat_id, text.to_string()));
            Ok(SentMessage { message_id: sent.len() as i64 })
        }

        async fn edit_message_text(
            &self,
            _chat_id: i64,
            _message_id: i64,
            _text: &str,
        ) -> Result<(), TelegramError> {
            self.check_error()
        }

        async fn delete_message(
            &self,
            _chat_id: i64,
            _message_id: i64,
        ) -> Result<(), TelegramError> {
            self.check_error()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_update() {
        let json = r#"{
            "update_id": 1001,
            "message": {
                "message_id": 7,
                "chat": {"id": -42, "type": "private"},
                "text": "/status",
                "date": 1700000000
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        assert_eq!(update.update_id, 1001);
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, -42);
        assert_eq!(message.text.as_deref(), Some("/status"));
    }

    #[test]
    fn test_parse_update_without_message() {
        let update: Update = serde_json::from_str(r#"{"update_id": 5}"#).unwrap();
        assert!(update.message.is_none());
    }

    #[test]
    fn test_parse_api_error_envelope() {
        let json = r#"{"ok": false, "error_code": 400, "description": "Bad Request"}"#;
        let envelope: ApiResponse<Vec<Update>> = serde_json::from_str(json).unwrap();
        assert!(!envelope.ok);
        assert_eq!(envelope.description.as_deref(), Some("Bad Request"));
    }

    #[test]
    fn test_error_display() {
        let error = TelegramError::Api { description: "chat not found".to_string() };
        assert!(format!("{error}").contains("chat not found"));
    }

    #[test]
    fn test_main_menu_layout() {
        let markup = main_menu_markup();
        assert_eq!(markup["keyboard"][0][0], "/liquiditychart");
        assert_eq!(markup["keyboard"][1][1], "/help");
        assert_eq!(markup["resize_keyboard"], true);
    }

    #[tokio::test]
    async fn test_mock_notifier_records_and_fails_on_demand() {
        let mock = MockNotifier::new();
        mock.send_message(7, "hello").await.unwrap();
        assert_eq!(mock.sent(), vec![(7, "hello".to_string())]);

        mock.set_error("simulated outage");
        assert!(mock.send_message(7, "again").await.is_err());
        assert_eq!(mock.sent().len(), 1);

        mock.clear_error();
        assert!(mock.send_message(8, "back").await.is_ok());
    }
}
