//! Telegram transport.
//!
//! An admin's chat endpoint is their private chat ID with the bot. Decision
//! buttons carry [`Decision::key`] as callback data, so a button press is
//! enough to identify both the application and the decision.

mod client;
mod error;
mod types;

use async_trait::async_trait;
use tracing::instrument;

use verifydesk_core::{ChatEndpoint, Decision};

use super::{ChatTransport, MessageRef, Prompt, TransportError};

pub use client::TelegramClient;
pub use error::TelegramError;
pub use types::{CallbackQuery, Message, Update, User, WebhookReply};

use types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// [`ChatTransport`] over the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramTransport {
    client: TelegramClient,
}

impl TelegramTransport {
    #[must_use]
    pub const fn new(client: TelegramClient) -> Self {
        Self { client }
    }

    #[must_use]
    pub const fn client(&self) -> &TelegramClient {
        &self.client
    }
}

/// One row per decision so long labels are not squeezed.
fn keyboard(prompt: &Prompt) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: prompt
            .actions
            .iter()
            .map(|decision: &Decision| {
                vec![InlineKeyboardButton {
                    text: decision.label().to_string(),
                    callback_data: decision.key(&prompt.application_id),
                }]
            })
            .collect(),
    }
}

fn prompt_text(prompt: &Prompt) -> String {
    format!("{}\n\n{}", prompt.plain_text(), prompt.footer)
}

fn parse_message_id(message: &MessageRef) -> Result<i64, TransportError> {
    message
        .message_id
        .parse()
        .map_err(|_| TransportError::Other(format!("bad message id {}", message.message_id)))
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    fn name(&self) -> &'static str {
        "telegram"
    }

    #[instrument(skip(self, prompt), fields(application_id = %prompt.application_id))]
    async fn send_prompt(
        &self,
        endpoint: &ChatEndpoint,
        prompt: &Prompt,
    ) -> Result<MessageRef, TransportError> {
        let sent = self
            .client
            .send_message(
                endpoint.as_str(),
                &prompt_text(prompt),
                Some(keyboard(prompt)),
            )
            .await?;
        Ok(MessageRef {
            channel: sent.chat.id.to_string(),
            message_id: sent.message_id.to_string(),
        })
    }

    async fn send_text(
        &self,
        endpoint: &ChatEndpoint,
        text: &str,
    ) -> Result<MessageRef, TransportError> {
        let sent = self
            .client
            .send_message(endpoint.as_str(), text, None)
            .await?;
        Ok(MessageRef {
            channel: sent.chat.id.to_string(),
            message_id: sent.message_id.to_string(),
        })
    }

    async fn replace_prompt(
        &self,
        message: &MessageRef,
        text: &str,
    ) -> Result<(), TransportError> {
        let message_id = parse_message_id(message)?;
        self.client
            .edit_message_text(&message.channel, message_id, text)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use verifydesk_core::{ApplicationId, PinDecision, Stage};

    use super::*;

    #[test]
    fn test_keyboard_callback_data_round_trips() {
        let prompt = Prompt {
            application_id: ApplicationId::new("APP-0190f3c2a1b27c4d8e9f0a1b2c3d4e5f"),
            stage: Stage::Pin,
            title: "PIN verification".to_string(),
            fields: Vec::new(),
            actions: vec![
                Decision::Pin(PinDecision::Approve),
                Decision::Pin(PinDecision::Deny),
            ],
            footer: String::new(),
        };
        let markup = keyboard(&prompt);
        assert_eq!(markup.inline_keyboard.len(), 2);
        let data = &markup.inline_keyboard[1][0].callback_data;
        assert!(data.len() <= 64);
        let (decision, id) = Decision::parse_key(data).unwrap();
        assert_eq!(decision, Decision::Pin(PinDecision::Deny));
        assert_eq!(id, prompt.application_id);
    }
}
