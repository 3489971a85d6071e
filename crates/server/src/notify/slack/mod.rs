//! Slack transport.
//!
//! An admin's chat endpoint is their Slack user ID; prompts arrive as DMs
//! from the bot. Button clicks come back through the interactions route
//! with the decision in `action_id` and the application ID in `value`.

mod client;
mod error;
mod messages;
mod types;

use async_trait::async_trait;
use tracing::instrument;

use verifydesk_core::ChatEndpoint;

use super::{ChatTransport, MessageRef, Prompt, TransportError};

pub use client::{SlackClient, constant_time_compare, sign};
pub use error::SlackError;
pub use messages::{build_prompt_blocks, build_text_blocks};
pub use types::{
    EphemeralResponse, InteractionAction, InteractionPayload, InteractionUser, SlashCommand,
};

/// [`ChatTransport`] over the Slack Web API.
#[derive(Debug, Clone)]
pub struct SlackTransport {
    client: SlackClient,
}

impl SlackTransport {
    #[must_use]
    pub const fn new(client: SlackClient) -> Self {
        Self { client }
    }

    #[must_use]
    pub const fn client(&self) -> &SlackClient {
        &self.client
    }
}

fn message_ref(
    response: types::MessageResponse,
    fallback_channel: &str,
) -> Result<MessageRef, SlackError> {
    let message_id = response
        .ts
        .ok_or_else(|| SlackError::Response("missing message ts".to_string()))?;
    Ok(MessageRef {
        channel: response
            .channel
            .unwrap_or_else(|| fallback_channel.to_string()),
        message_id,
    })
}

#[async_trait]
impl ChatTransport for SlackTransport {
    fn name(&self) -> &'static str {
        "slack"
    }

    #[instrument(skip(self, prompt), fields(application_id = %prompt.application_id))]
    async fn send_prompt(
        &self,
        endpoint: &ChatEndpoint,
        prompt: &Prompt,
    ) -> Result<MessageRef, TransportError> {
        let response = self
            .client
            .post_message(
                endpoint.as_str(),
                build_prompt_blocks(prompt),
                &prompt.plain_text(),
            )
            .await?;
        Ok(message_ref(response, endpoint.as_str())?)
    }

    async fn send_text(
        &self,
        endpoint: &ChatEndpoint,
        text: &str,
    ) -> Result<MessageRef, TransportError> {
        let response = self
            .client
            .post_message(endpoint.as_str(), build_text_blocks(text), text)
            .await?;
        Ok(message_ref(response, endpoint.as_str())?)
    }

    async fn replace_prompt(
        &self,
        message: &MessageRef,
        text: &str,
    ) -> Result<(), TransportError> {
        self.client
            .update_message(
                &message.channel,
                &message.message_id,
                build_text_blocks(text),
                text,
            )
            .await?;
        Ok(())
    }
}
