//! Slack Web API client.
//!
//! Posts and updates messages, and verifies inbound request signatures.

use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::{debug, error, instrument};

use super::error::SlackError;
use super::types::{Block, EphemeralResponse, MessageResponse, PostMessage, UpdateMessage};

/// Slack Web API base URL.
const SLACK_API_BASE: &str = "https://slack.com/api";

/// Signed requests older than this many seconds are rejected.
const MAX_SIGNATURE_AGE_SECS: i64 = 300;

#[derive(Clone)]
pub struct SlackClient {
    client: Client,
    bot_token: SecretString,
    signing_secret: SecretString,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("bot_token", &"[REDACTED]")
            .field("signing_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SlackClient {
    #[must_use]
    pub fn new(client: Client, bot_token: SecretString, signing_secret: SecretString) -> Self {
        Self {
            client,
            bot_token,
            signing_secret,
        }
    }

    /// Post a message. Posting to a user ID delivers a DM from the bot.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Slack returns an error.
    #[instrument(skip(self, blocks, text), fields(channel = %channel))]
    pub async fn post_message(
        &self,
        channel: &str,
        blocks: Vec<Block>,
        text: &str,
    ) -> Result<MessageResponse, SlackError> {
        let message = PostMessage {
            channel: channel.to_string(),
            blocks,
            text: text.to_string(),
        };
        let result = self.call("chat.postMessage", &message).await?;

        debug!(ts = ?result.ts, channel = ?result.channel, "Message posted to Slack");
        Ok(result)
    }

    /// Replace the content of an existing message.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Slack returns an error.
    #[instrument(skip(self, blocks, text), fields(channel = %channel, ts = %ts))]
    pub async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        blocks: Vec<Block>,
        text: &str,
    ) -> Result<MessageResponse, SlackError> {
        let message = UpdateMessage {
            channel: channel.to_string(),
            ts: ts.to_string(),
            blocks,
            text: text.to_string(),
        };
        let result = self.call("chat.update", &message).await?;

        debug!("Message updated in Slack");
        Ok(result)
    }

    /// Post an ephemeral reply to an interaction's `response_url`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or Slack rejects it.
    #[instrument(skip(self, response_url, text))]
    pub async fn respond(&self, response_url: &str, text: &str) -> Result<(), SlackError> {
        let response = self
            .client
            .post(response_url)
            .json(&EphemeralResponse::new(text))
            .send()
            .await
            .map_err(|e| SlackError::Request(e.without_url().to_string()))?;
        if !response.status().is_success() {
            return Err(SlackError::Api(format!(
                "response_url returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn call<T: serde::Serialize + Sync>(
        &self,
        method: &str,
        body: &T,
    ) -> Result<MessageResponse, SlackError> {
        let response = self
            .client
            .post(format!("{SLACK_API_BASE}/{method}"))
            .bearer_auth(self.bot_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| SlackError::Request(e.to_string()))?;

        let result: MessageResponse = response
            .json()
            .await
            .map_err(|e| SlackError::Response(e.to_string()))?;

        if !result.ok {
            error!(method, error = ?result.error, "Slack API error");
            return Err(SlackError::Api(
                result.error.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }
        Ok(result)
    }

    /// Verify a Slack request signature.
    ///
    /// See <https://api.slack.com/authentication/verifying-requests-from-slack>.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSignature` if the timestamp is malformed or stale, or
    /// the signature does not match.
    #[instrument(skip(self, body, signature))]
    pub fn verify_signature(
        &self,
        timestamp: &str,
        body: &str,
        signature: &str,
    ) -> Result<(), SlackError> {
        let ts: i64 = timestamp
            .parse()
            .map_err(|_| SlackError::InvalidSignature("Invalid timestamp".to_string()))?;

        if (chrono::Utc::now().timestamp() - ts).abs() > MAX_SIGNATURE_AGE_SECS {
            return Err(SlackError::InvalidSignature(
                "Request timestamp too old".to_string(),
            ));
        }

        let expected = sign(self.signing_secret.expose_secret(), timestamp, body)?;
        if !constant_time_compare(&expected, signature) {
            return Err(SlackError::InvalidSignature(
                "Signature mismatch".to_string(),
            ));
        }

        debug!("Slack signature verified");
        Ok(())
    }
}

/// Compute the `v0=` signature Slack sends for a request.
///
/// # Errors
///
/// Returns `InvalidSignature` if the secret cannot key the MAC.
pub fn sign(secret: &str, timestamp: &str, body: &str) -> Result<String, SlackError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| SlackError::InvalidSignature(e.to_string()))?;
    mac.update(format!("v0:{timestamp}:{body}").as_bytes());
    Ok(format!("v0={}", hex::encode(mac.finalize().into_bytes())))
}

/// Constant-time string comparison to prevent timing attacks.
#[must_use]
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
