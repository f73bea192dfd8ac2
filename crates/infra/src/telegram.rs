//! # Telegram notifications
//!
//! Mirrors in-app notifications to a user's Telegram chat when one is
//! linked. Delivery is fire-and-forget: failures are logged, never
//! surfaced to the caller.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::InfraError;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), InfraError>;
}

/// Bot API client. Uses `sendMessage` with plain text.
pub struct TelegramNotifier {
    client:    reqwest::Client,
    bot_token: String,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text:    &'a str,
}

impl TelegramNotifier {
    pub fn new(bot_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token,
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), InfraError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let response = self
            .client
            .post(&url)
            .json(&SendMessageRequest { chat_id, text })
            .send()
            .await
            .map_err(|e| InfraError::http(format!("telegram request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(InfraError::http(format!(
                "telegram responded {status}: {body}"
            )));
        }
        Ok(())
    }
}

/// Used when no bot token is configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, _chat_id: &str, _text: &str) -> Result<(), InfraError> {
        Ok(())
    }
}
