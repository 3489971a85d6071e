//! Telegram Bot API wire types (the subset used here).
//!
//! See: <https://core.telegram.org/bots/api>

use serde::{Deserialize, Serialize};

/// Envelope of every Bot API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendMessage {
    /// Chat ID; the Bot API accepts it as a string.
    pub chat_id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

/// Replaces text and, by omitting `reply_markup`, removes the keyboard.
#[derive(Debug, Clone, Serialize)]
pub struct EditMessageText {
    pub chat_id: String,
    pub message_id: i64,
    pub text: String,
}

/// Bot API call returned as the webhook response body, which Telegram
/// executes without a separate request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method")]
pub enum WebhookReply {
    /// Toast shown on the pressed button.
    #[serde(rename = "answerCallbackQuery")]
    AnswerCallbackQuery {
        callback_query_id: String,
        text: String,
        show_alert: bool,
    },
    #[serde(rename = "sendMessage")]
    SendMessage { chat_id: String, text: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    /// At most 64 bytes.
    pub callback_data: String,
}

// =============================================================================
// Inbound Updates
// =============================================================================

/// Webhook update. Only messages and callback queries are handled.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

/// Inline button press.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_update_parses() {
        let raw = r#"{
            "update_id": 7,
            "callback_query": {
                "id": "cb1",
                "from": {"id": 42, "is_bot": false, "first_name": "Ann"},
                "message": {"message_id": 9, "chat": {"id": 42, "type": "private"}, "text": "prompt"},
                "data": "pin:approve:APP-1"
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        let query = update.callback_query.unwrap();
        assert_eq!(query.from.id, 42);
        assert_eq!(query.data.as_deref(), Some("pin:approve:APP-1"));
        assert_eq!(query.message.unwrap().chat.id, 42);
    }

    #[test]
    fn test_error_response_has_no_result() {
        let raw = r#"{"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}"#;
        let response: ApiResponse<Message> = serde_json::from_str(raw).unwrap();
        assert!(!response.ok);
        assert!(response.result.is_none());
        assert_eq!(
            response.description.as_deref(),
            Some("Bad Request: chat not found")
        );

        let raw = r#"{"ok": true, "result": {"message_id": 5, "chat": {"id": 42, "type": "private"}}}"#;
        let response: ApiResponse<Message> = serde_json::from_str(raw).unwrap();
        assert_eq!(response.result.unwrap().message_id, 5);
    }

    #[test]
    fn test_webhook_reply_carries_method() {
        let reply = WebhookReply::AnswerCallbackQuery {
            callback_query_id: "cb1".to_string(),
            text: "PIN approved".to_string(),
            show_alert: false,
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["method"], "answerCallbackQuery");
        assert_eq!(json["callback_query_id"], "cb1");
    }

    #[test]
    fn test_send_message_omits_missing_keyboard() {
        let body = SendMessage {
            chat_id: "42".to_string(),
            text: "hi".to_string(),
            reply_markup: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("reply_markup").is_none());
        assert_eq!(json["chat_id"], "42");
    }
}
