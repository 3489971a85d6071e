//! Telegram Bot API client.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};

use super::error::TelegramError;
use super::types::{ApiResponse, EditMessageText, InlineKeyboardMarkup, Message, SendMessage};
use crate::notify::slack::constant_time_compare;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    bot_token: SecretString,
    webhook_secret: SecretString,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("bot_token", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    #[must_use]
    pub fn new(client: Client, bot_token: SecretString, webhook_secret: SecretString) -> Self {
        Self {
            client,
            bot_token,
            webhook_secret,
        }
    }

    /// Send a message, optionally with an inline keyboard.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the Bot API rejects it.
    #[instrument(skip(self, text, keyboard))]
    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<Message, TelegramError> {
        let body = SendMessage {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
            reply_markup: keyboard,
        };
        let message: Message = self.call("sendMessage", &body).await?;
        debug!(message_id = message.message_id, "Message sent to Telegram");
        Ok(message)
    }

    /// Replace a message's text and drop its keyboard.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the Bot API rejects it.
    #[instrument(skip(self, text))]
    pub async fn edit_message_text(
        &self,
        chat_id: &str,
        message_id: i64,
        text: &str,
    ) -> Result<(), TelegramError> {
        let body = EditMessageText {
            chat_id: chat_id.to_string(),
            message_id,
            text: text.to_string(),
        };
        // The result is the edited message, or `true` for inline messages.
        let _: serde_json::Value = self.call("editMessageText", &body).await?;
        Ok(())
    }

    /// Check the `X-Telegram-Bot-Api-Secret-Token` header of a webhook call.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSecret` if the header is missing or does not match.
    pub fn verify_webhook_secret(&self, header: Option<&str>) -> Result<(), TelegramError> {
        match header {
            Some(value) if constant_time_compare(value, self.webhook_secret.expose_secret()) => {
                Ok(())
            }
            _ => Err(TelegramError::InvalidSecret),
        }
    }

    async fn call<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, TelegramError> {
        let url = format!(
            "{TELEGRAM_API_BASE}/bot{}/{method}",
            self.bot_token.expose_secret()
        );
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            // reqwest errors include the URL, which carries the token
            .map_err(|e| TelegramError::Request(e.without_url().to_string()))?;

        let result: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TelegramError::Response(e.without_url().to_string()))?;

        if !result.ok {
            error!(method, error = ?result.description, "Telegram API error");
            return Err(TelegramError::Api(
                result
                    .description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }
        result
            .result
            .ok_or_else(|| TelegramError::Response(format!("{method} returned no result")))
    }
}
