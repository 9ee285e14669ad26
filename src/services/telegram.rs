// src/services/telegram.rs

//! Outbound alerts through the Telegram Bot API.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::TelegramConfig;
use crate::utils::http::create_api_client;

/// A message ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub chat_id: String,
    pub text: String,
    pub parse_mode: String,
    /// Suppress link preview expansion
    pub disable_preview: bool,
}

impl OutboundMessage {
    /// HTML-formatted message without link previews.
    pub fn html(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: text.into(),
            parse_mode: "HTML".to_string(),
            disable_preview: true,
        }
    }
}

/// Delivers formatted messages to a chat.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<()>;
}

/// `sendMessage` client for one bot.
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, token: &str, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: create_api_client(timeout_secs)?,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                api_base.trim_end_matches('/'),
                token.trim()
            ),
        })
    }

    /// Build a notifier, or `None` when token or chat id is missing.
    pub fn from_config(config: &TelegramConfig) -> Result<Option<Self>> {
        if !config.has_credentials() {
            return Ok(None);
        }
        Self::new(&config.api_base, &config.token, config.timeout_secs).map(Some)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &OutboundMessage) -> Result<()> {
        let disable_preview = if message.disable_preview { "true" } else { "false" };
        let params = [
            ("chat_id", message.chat_id.as_str()),
            ("text", message.text.as_str()),
            ("parse_mode", message.parse_mode.as_str()),
            ("disable_web_page_preview", disable_preview),
        ];

        let response = self
            .client
            .post(&self.endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::dispatch(e.without_url()))?;

        let status = response.status();
        if status.is_success() {
            log::debug!("Telegram accepted message for chat {}", message.chat_id);
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AppError::dispatch(format!("Telegram answered {status}: {body}")))
        }
    }
}
