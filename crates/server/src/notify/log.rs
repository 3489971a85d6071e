//! Transport that only logs. Used for local runs without chat credentials.

use async_trait::async_trait;
use tracing::info;

use verifydesk_core::ChatEndpoint;

use super::{ChatTransport, MessageRef, Prompt, TransportError};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

fn local_ref(endpoint: &ChatEndpoint) -> MessageRef {
    MessageRef {
        channel: endpoint.to_string(),
        message_id: uuid::Uuid::now_v7().simple().to_string(),
    }
}

#[async_trait]
impl ChatTransport for LogTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send_prompt(
        &self,
        endpoint: &ChatEndpoint,
        prompt: &Prompt,
    ) -> Result<MessageRef, TransportError> {
        let message = local_ref(endpoint);
        let actions: Vec<String> = prompt
            .actions
            .iter()
            .map(|decision| decision.key(&prompt.application_id))
            .collect();
        info!(
            %endpoint,
            message_id = %message.message_id,
            title = %prompt.title,
            ?actions,
            "Prompt (log transport)"
        );
        Ok(message)
    }

    async fn send_text(
        &self,
        endpoint: &ChatEndpoint,
        text: &str,
    ) -> Result<MessageRef, TransportError> {
        let message = local_ref(endpoint);
        info!(%endpoint, message_id = %message.message_id, text, "Message (log transport)");
        Ok(message)
    }

    async fn replace_prompt(
        &self,
        message: &MessageRef,
        text: &str,
    ) -> Result<(), TransportError> {
        info!(
            channel = %message.channel,
            message_id = %message.message_id,
            text,
            "Prompt replaced (log transport)"
        );
        Ok(())
    }
}
