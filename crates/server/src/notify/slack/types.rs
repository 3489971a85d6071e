//! Slack wire types: the Block Kit subset used for prompts, Web API
//! responses, and inbound interaction and slash-command payloads.
//!
//! See: <https://api.slack.com/block-kit>

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use super::error::SlackError;

/// Body of `chat.postMessage`.
#[derive(Debug, Clone, Serialize)]
pub struct PostMessage {
    /// Channel, or a user ID to open the bot DM.
    pub channel: String,
    pub blocks: Vec<Block>,
    /// Notification fallback text.
    pub text: String,
}

/// Body of `chat.update`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateMessage {
    pub channel: String,
    pub ts: String,
    pub blocks: Vec<Block>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: PlainText,
    },
    Section {
        text: Text,
    },
    /// Small muted text.
    Context {
        elements: Vec<Text>,
    },
    Actions {
        block_id: String,
        elements: Vec<ActionElement>,
    },
    Divider,
}

/// Text object.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    PlainText { text: String, emoji: bool },
    Mrkdwn { text: String },
}

impl Text {
    #[must_use]
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

/// Plain text object (headers and button labels).
#[derive(Debug, Clone, Serialize)]
pub struct PlainText {
    #[serde(rename = "type")]
    pub text_type: &'static str,
    pub text: String,
    pub emoji: bool,
}

impl PlainText {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text_type: "plain_text",
            text: text.into(),
            emoji: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionElement {
    Button {
        text: PlainText,
        action_id: String,
        value: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        style: Option<ButtonStyle>,
    },
}

/// Button colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

// =============================================================================
// Response Types
// =============================================================================

/// Response from `chat.postMessage` and `chat.update`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub ok: bool,
    /// Resolved channel; a DM channel ID when a user ID was posted to.
    #[serde(default)]
    pub channel: Option<String>,
    /// Message timestamp, Slack's message ID.
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

// =============================================================================
// Inbound Payloads
// =============================================================================

/// Button-click payload, delivered form-encoded as `payload=<json>`.
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionPayload {
    #[serde(rename = "type")]
    pub interaction_type: String,
    pub user: InteractionUser,
    #[serde(default)]
    pub actions: Vec<InteractionAction>,
    #[serde(default)]
    pub response_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionAction {
    pub action_id: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl InteractionPayload {
    /// Decode a form-encoded interaction request body.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` if the `payload` field is missing or is not
    /// an interaction.
    pub fn from_form(body: &str) -> Result<Self, SlackError> {
        let raw = form_urlencoded::parse(body.as_bytes())
            .find(|(key, _)| key == "payload")
            .map(|(_, value)| value)
            .ok_or_else(|| SlackError::InvalidPayload("missing payload field".into()))?;
        serde_json::from_str(&raw).map_err(|e| SlackError::InvalidPayload(e.to_string()))
    }
}

/// Slash-command payload (form-encoded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashCommand {
    pub command: String,
    pub text: String,
    pub user_id: String,
    pub channel_id: Option<String>,
}

impl SlashCommand {
    /// Decode a form-encoded slash-command request body.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` if `command` or `user_id` is missing.
    pub fn from_form(body: &str) -> Result<Self, SlackError> {
        let mut command = None;
        let mut text = String::new();
        let mut user_id = None;
        let mut channel_id = None;
        for (key, value) in form_urlencoded::parse(body.as_bytes()) {
            match key.as_ref() {
                "command" => command = Some(value.into_owned()),
                "text" => text = value.into_owned(),
                "user_id" => user_id = Some(value.into_owned()),
                "channel_id" => channel_id = Some(value.into_owned()),
                _ => {}
            }
        }
        Ok(Self {
            command: command.ok_or_else(|| SlackError::InvalidPayload("missing command".into()))?,
            text,
            user_id: user_id.ok_or_else(|| SlackError::InvalidPayload("missing user_id".into()))?,
            channel_id,
        })
    }
}

/// Reply visible only to the user who clicked or typed.
///
/// Returned inline for slash commands and posted to `response_url` for
/// interactions.
#[derive(Debug, Clone, Serialize)]
pub struct EphemeralResponse {
    pub response_type: &'static str,
    pub replace_original: bool,
    pub text: String,
}

impl EphemeralResponse {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            response_type: "ephemeral",
            replace_original: false,
            text: text.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_from_form() {
        let body = "payload=%7B%22type%22%3A%22block_actions%22%2C%22user%22%3A%7B%22id%22%3A%22U1%22%7D%2C%22actions%22%3A%5B%7B%22action_id%22%3A%22pin_approve%22%2C%22value%22%3A%22APP-1%22%7D%5D%7D";
        let payload = InteractionPayload::from_form(body).unwrap();
        assert_eq!(payload.user.id, "U1");
        assert_eq!(payload.actions[0].action_id, "pin_approve");
        assert!(InteractionPayload::from_form("other=1").is_err());
    }

    #[test]
    fn test_slash_command_from_form() {
        let body = "command=%2Fstart&text=ADM-1&user_id=U42&channel_id=D1&team_id=T1";
        let command = SlashCommand::from_form(body).unwrap();
        assert_eq!(command.command, "/start");
        assert_eq!(command.text, "ADM-1");
        assert_eq!(command.user_id, "U42");
        assert_eq!(command.channel_id.as_deref(), Some("D1"));

        let plus_spaces = SlashCommand::from_form("command=%2Fhelp&text=a+b&user_id=U1").unwrap();
        assert_eq!(plus_spaces.text, "a b");

        assert!(SlashCommand::from_form("text=hi").is_err());
    }

    #[test]
    fn test_block_serialization() {
        let block = Block::Actions {
            block_id: "decide".to_string(),
            elements: vec![ActionElement::Button {
                text: PlainText::new("Approve"),
                action_id: "pin_approve".to_string(),
                value: "APP-1".to_string(),
                style: Some(ButtonStyle::Primary),
            }],
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "actions");
        assert_eq!(json["elements"][0]["type"], "button");
        assert_eq!(json["elements"][0]["text"]["type"], "plain_text");
        assert_eq!(json["elements"][0]["style"], "primary");
        assert_eq!(json["elements"][0]["value"], "APP-1");
    }

    #[test]
    fn test_interaction_payload_parses() {
        let raw = r#"{
            "type": "block_actions",
            "user": {"id": "U123", "username": "alice"},
            "container": {"type": "message", "message_ts": "1.2"},
            "actions": [{"action_id": "code_wrong_pin", "value": "APP-9", "type": "button"}],
            "response_url": "https://hooks.slack.com/actions/x"
        }"#;
        let payload: InteractionPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.user.id, "U123");
        assert_eq!(payload.actions[0].action_id, "code_wrong_pin");
        assert_eq!(payload.actions[0].value.as_deref(), Some("APP-9"));
    }
}
