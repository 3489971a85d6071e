//! Admin notifications.
//!
//! The workflow commits every state change before anything is sent; this
//! module only tells the admin about it. Delivery is at-least-once: a retry
//! after a timed-out request can produce a duplicate prompt, which is safe
//! because decisions are idempotent in the workflow.
//!
//! # Transports
//!
//! [`ChatTransport`] is the one seam between the dispatcher and a chat
//! service. Implementations:
//!
//! - [`SlackTransport`] - Block Kit DMs with buttons
//! - [`TelegramTransport`] - Bot API messages with inline keyboards
//! - [`LogTransport`] - writes notifications to the log only
//! - [`RecordingTransport`] - keeps everything in memory, for tests
//!
//! # Flow
//!
//! 1. A new application or submitted code produces a prompt with one button
//!    per legal decision
//! 2. The prompt's message handle is stored on the application
//! 3. When the admin decides, the prompt is replaced by the outcome, which
//!    removes the buttons

mod dispatcher;
mod log;
mod recording;
pub mod render;
pub mod slack;
pub mod telegram;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use verifydesk_core::{ApplicationId, ChatEndpoint, Decision, Stage};

pub use crate::models::MessageRef;
pub use dispatcher::Dispatcher;
pub use log::LogTransport;
pub use recording::{RecordingTransport, SentMessage};
pub use slack::{SlackError, SlackTransport};
pub use telegram::{TelegramError, TelegramTransport};

/// Errors from a single delivery attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Slack(#[from] SlackError),

    #[error(transparent)]
    Telegram(#[from] TelegramError),

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("delivery failed: {0}")]
    Other(String),
}

/// A message asking an admin to decide one stage of an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub application_id: ApplicationId,
    pub stage: Stage,
    /// Short heading.
    pub title: String,
    /// Labelled values shown to the admin.
    pub fields: Vec<PromptField>,
    /// One button per legal decision, in display order.
    pub actions: Vec<Decision>,
    /// Muted line under the fields.
    pub footer: String,
}

impl Prompt {
    /// Plain-text rendering, used as notification fallback text.
    #[must_use]
    pub fn plain_text(&self) -> String {
        let mut text = self.title.clone();
        for field in &self.fields {
            text.push('\n');
            text.push_str(&field.label);
            text.push_str(": ");
            text.push_str(&field.value);
        }
        text
    }
}

/// One labelled value of a [`Prompt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptField {
    pub label: String,
    pub value: String,
}

impl PromptField {
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A chat service that can reach admins.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Send a prompt with decision buttons.
    async fn send_prompt(
        &self,
        endpoint: &ChatEndpoint,
        prompt: &Prompt,
    ) -> Result<MessageRef, TransportError>;

    /// Send a plain message.
    async fn send_text(
        &self,
        endpoint: &ChatEndpoint,
        text: &str,
    ) -> Result<MessageRef, TransportError>;

    /// Replace a previously sent prompt (and its buttons) with `text`.
    async fn replace_prompt(&self, message: &MessageRef, text: &str)
    -> Result<(), TransportError>;
}

/// What happened to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryResult {
    /// Accepted by the chat service.
    Delivered { message: MessageRef },
    /// The admin has no chat endpoint (or no longer exists).
    Unreachable,
    /// The admin is paused; new prompts are held back.
    Suppressed,
    /// Every attempt failed.
    Failed { attempts: u32, error: String },
}

impl DeliveryResult {
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}
