// src/services/telegram.rs

//! Telegram Bot API client.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::{ChatId, TelegramConfig};
use crate::services::broadcaster::MessageSender;
use crate::utils::http::create_async_client;

const USER_AGENT: &str = concat!("wod-rae/", env!("CARGO_PKG_VERSION"));

/// Body returned by every Bot API method.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramResponse {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Sends messages through `sendMessage`.
pub struct TelegramClient {
    client: reqwest::Client,
    /// Contains the bot token; never logged
    endpoint: String,
    parse_mode: String,
    disable_web_page_preview: bool,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig, bot_token: &str) -> Result<Self> {
        if bot_token.trim().is_empty() {
            return Err(AppError::MissingToken);
        }
        let client = create_async_client(USER_AGENT, config.timeout())?;
        let endpoint = format!(
            "{}/bot{}/sendMessage",
            config.api_base.trim_end_matches('/'),
            bot_token.trim()
        );

        Ok(Self {
            client,
            endpoint,
            parse_mode: config.parse_mode.clone(),
            disable_web_page_preview: config.disable_web_page_preview,
        })
    }
}

impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient")
            .field("endpoint", &"<redacted>")
            .field("parse_mode", &self.parse_mode)
            .field("disable_web_page_preview", &self.disable_web_page_preview)
            .finish()
    }
}

#[async_trait]
impl MessageSender for TelegramClient {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let chat = chat_id.to_string();
        let disable_preview = self.disable_web_page_preview.to_string();
        let params = [
            ("chat_id", chat.as_str()),
            ("text", text),
            ("parse_mode", self.parse_mode.as_str()),
            ("disable_web_page_preview", disable_preview.as_str()),
        ];

        let request = async {
            let response = self.client.post(&self.endpoint).form(&params).send().await?;
            response.text().await
        };

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("sender routine cancelled by context, recipient {chat_id}");
                return Err(AppError::Cancelled);
            }
            result = request => match result {
                Ok(body) => body,
                Err(_) if cancel.is_cancelled() => return Err(AppError::Cancelled),
                Err(source) => return Err(AppError::Transport { recipient: chat_id, source }),
            },
        };

        let response: TelegramResponse = serde_json::from_str(&body)
            .map_err(|source| AppError::Decode { recipient: chat_id, source })?;

        log::debug!(
            "got telegram API response for {chat_id}: ok={} error_code={:?}",
            response.ok,
            response.error_code
        );

        if !response.ok {
            return Err(AppError::Rejected {
                recipient: chat_id,
                code: response.error_code.unwrap_or_default(),
                description: response.description.unwrap_or_default(),
            });
        }
        Ok(())
    }
}
