//! Slack errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlackError {
    /// HTTP request failed.
    #[error("Slack request failed: {0}")]
    Request(String),

    /// Response body could not be read.
    #[error("Slack response error: {0}")]
    Response(String),

    /// Slack answered with `ok: false`.
    #[error("Slack API error: {0}")]
    Api(String),

    #[error("Invalid Slack signature: {0}")]
    InvalidSignature(String),

    /// Interaction or command payload could not be parsed.
    #[error("Invalid Slack payload: {0}")]
    InvalidPayload(String),
}
