//! In-memory transport that records every send, for tests.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use verifydesk_core::ChatEndpoint;

use super::{ChatTransport, MessageRef, Prompt, TransportError};

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Prompt {
        endpoint: ChatEndpoint,
        prompt: Prompt,
        message: MessageRef,
    },
    Text {
        endpoint: ChatEndpoint,
        text: String,
        message: MessageRef,
    },
    Replaced {
        message: MessageRef,
        text: String,
    },
}

impl SentMessage {
    #[must_use]
    pub const fn as_prompt(&self) -> Option<&Prompt> {
        match self {
            Self::Prompt { prompt, .. } => Some(prompt),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<SentMessage>>,
    failures_left: AtomicU32,
    attempts: AtomicU32,
    next_id: AtomicU64,
    delay: Mutex<Option<Duration>>,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` calls fail.
    pub fn fail_next(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    /// Sleep this long inside every call.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().await = delay;
    }

    /// Successful calls, in order.
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Successful prompts, in order.
    pub async fn prompts(&self) -> Vec<Prompt> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(SentMessage::as_prompt)
            .cloned()
            .collect()
    }

    /// Every call made, including failed ones.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    async fn begin(&self) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TransportError::Other("injected failure".to_string()));
        }
        Ok(())
    }

    fn next_ref(&self, endpoint: &ChatEndpoint) -> MessageRef {
        MessageRef {
            channel: endpoint.to_string(),
            message_id: (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string(),
        }
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send_prompt(
        &self,
        endpoint: &ChatEndpoint,
        prompt: &Prompt,
    ) -> Result<MessageRef, TransportError> {
        self.begin().await?;
        let message = self.next_ref(endpoint);
        self.sent.lock().await.push(SentMessage::Prompt {
            endpoint: endpoint.clone(),
            prompt: prompt.clone(),
            message: message.clone(),
        });
        Ok(message)
    }

    async fn send_text(
        &self,
        endpoint: &ChatEndpoint,
        text: &str,
    ) -> Result<MessageRef, TransportError> {
        self.begin().await?;
        let message = self.next_ref(endpoint);
        self.sent.lock().await.push(SentMessage::Text {
            endpoint: endpoint.clone(),
            text: text.to_string(),
            message: message.clone(),
        });
        Ok(message)
    }

    async fn replace_prompt(
        &self,
        message: &MessageRef,
        text: &str,
    ) -> Result<(), TransportError> {
        self.begin().await?;
        self.sent.lock().await.push(SentMessage::Replaced {
            message: message.clone(),
            text: text.to_string(),
        });
        Ok(())
    }
}
