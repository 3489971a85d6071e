//! Delivery of workflow events to the owning admin.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use verifydesk_core::{ChatEndpoint, Stage};

use super::{ChatTransport, DeliveryResult, MessageRef, Prompt, TransportError, render};
use crate::config::NotifyConfig;
use crate::db::RecordStore;
use crate::models::{Admin, Application};
use crate::workflow::WorkflowEvent;

/// Sends workflow events through a [`ChatTransport`] with bounded retries.
///
/// Never fails: every problem is folded into the returned
/// [`DeliveryResult`] and logged.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn ChatTransport>,
    store: Arc<dyn RecordStore>,
    policy: NotifyConfig,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        store: Arc<dyn RecordStore>,
        policy: NotifyConfig,
    ) -> Self {
        Self {
            transport,
            store,
            policy,
        }
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<dyn ChatTransport> {
        &self.transport
    }

    /// Tell `admin` about `event`.
    #[instrument(
        skip(self, admin, event),
        fields(
            admin_id = %admin.admin_id,
            application_id = %event.application().id,
            event = event.name(),
            transport = self.transport.name(),
        )
    )]
    pub async fn notify(&self, admin: &Admin, event: &WorkflowEvent) -> DeliveryResult {
        let Some(endpoint) = admin.endpoint.as_ref() else {
            info!("Admin has no chat endpoint; notification not sent");
            return DeliveryResult::Unreachable;
        };
        if event.is_prompt() && !admin.is_active() {
            info!("Admin is paused; prompt held back");
            return DeliveryResult::Suppressed;
        }

        let result = match event {
            WorkflowEvent::NewApplication(application) => {
                self.send_prompt(endpoint, application, render::pin_prompt(application))
                    .await
            }
            WorkflowEvent::CodeSubmitted(application) => {
                self.send_prompt(endpoint, application, render::code_prompt(application))
                    .await
            }
            WorkflowEvent::CodeResendRequested(application) => {
                self.send_text(endpoint, &render::resend_request(application))
                    .await
            }
            WorkflowEvent::PinDecided {
                application,
                decision,
            } => {
                let text = render::pin_outcome(application, *decision, admin);
                self.acknowledge(endpoint, application, Stage::Pin, &text)
                    .await
            }
            WorkflowEvent::CodeDecided {
                application,
                decision,
            } => {
                let text = render::code_outcome(application, *decision, admin);
                self.acknowledge(endpoint, application, Stage::Code, &text)
                    .await
            }
        };

        match &result {
            DeliveryResult::Delivered { message } => {
                debug!(message_id = %message.message_id, "Notification delivered");
            }
            DeliveryResult::Failed { attempts, error } => {
                error!(attempts, error = %error, "Notification failed");
            }
            DeliveryResult::Unreachable | DeliveryResult::Suppressed => {}
        }
        result
    }

    async fn send_prompt(
        &self,
        endpoint: &ChatEndpoint,
        application: &Application,
        prompt: Prompt,
    ) -> DeliveryResult {
        let result = self
            .with_retries(|| self.transport.send_prompt(endpoint, &prompt))
            .await;
        if let DeliveryResult::Delivered { message } = &result
            && let Err(e) = self
                .store
                .set_prompt_ref(&application.id, prompt.stage, message)
                .await
        {
            // The prompt still reached the admin; only the in-place edit on
            // decision is lost.
            warn!(error = %e, "Failed to record prompt message");
        }
        result
    }

    async fn send_text(&self, endpoint: &ChatEndpoint, text: &str) -> DeliveryResult {
        self.with_retries(|| self.transport.send_text(endpoint, text))
            .await
    }

    /// Edit the stage's prompt into the outcome, or post the outcome when
    /// there is no prompt to edit (or the edit keeps failing).
    async fn acknowledge(
        &self,
        endpoint: &ChatEndpoint,
        application: &Application,
        stage: Stage,
        text: &str,
    ) -> DeliveryResult {
        if let Some(prompt) = application.prompt(stage) {
            let replaced = self
                .with_retries(|| async {
                    self.transport
                        .replace_prompt(prompt, text)
                        .await
                        .map(|()| prompt.clone())
                })
                .await;
            if replaced.is_delivered() {
                return replaced;
            }
            warn!("Could not edit prompt; posting the outcome instead");
        }
        self.send_text(endpoint, text).await
    }

    async fn with_retries<F, Fut>(&self, mut op: F) -> DeliveryResult
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<MessageRef, TransportError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = tokio::time::timeout(self.policy.timeout, op())
                .await
                .unwrap_or(Err(TransportError::Timeout(self.policy.timeout)));

            match outcome {
                Ok(message) => return DeliveryResult::Delivered { message },
                Err(e) if attempt >= max_attempts => {
                    return DeliveryResult::Failed {
                        attempts: attempt,
                        error: e.to_string(),
                    };
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Delivery attempt failed, retrying");
                    tokio::time::sleep(backoff_delay(self.policy.retry_backoff, attempt)).await;
                }
            }
        }
    }
}

/// Wait before retry `attempt`: `attempt * step`, saturating.
fn backoff_delay(step: Duration, attempt: u32) -> Duration {
    step.checked_mul(attempt).unwrap_or(Duration::MAX)
}
