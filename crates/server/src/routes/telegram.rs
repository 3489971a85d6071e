//! Telegram webhook handler.
//!
//! Replies travel back in the webhook response body as a Bot API call, so
//! the handler itself never calls out to Telegram.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::{debug, info, instrument, warn};

use verifydesk_core::{ChatEndpoint, Decision};

use crate::chat::{ChatCommand, NOT_CONNECTED, decision_refusal};
use crate::error::AppError;
use crate::notify::telegram::{CallbackQuery, Message, Update, WebhookReply};
use crate::state::AppState;

const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

pub fn router() -> Router<AppState> {
    Router::new().route("/api/telegram/webhook", post(handle_update))
}

/// Handle a bot update. Anything other than a button press or a text
/// message is acknowledged and ignored.
#[instrument(skip_all)]
async fn handle_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> Result<Response, AppError> {
    let telegram = state
        .telegram()
        .ok_or_else(|| AppError::NotFound("Telegram is not configured".into()))?;

    telegram
        .verify_webhook_secret(headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok()))
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    debug!(update_id = update.update_id, "Telegram update received");

    let reply = if let Some(query) = update.callback_query {
        Some(handle_callback(&state, query).await?)
    } else if let Some(message) = update.message {
        handle_message(&state, message).await
    } else {
        None
    };

    Ok(match reply {
        Some(reply) => Json(reply).into_response(),
        None => StatusCode::OK.into_response(),
    })
}

/// Apply the decision behind an inline button and answer with a toast.
async fn handle_callback(
    state: &AppState,
    query: CallbackQuery,
) -> Result<WebhookReply, AppError> {
    let toast = |text: String, show_alert: bool| WebhookReply::AnswerCallbackQuery {
        callback_query_id: query.id.clone(),
        text,
        show_alert,
    };

    let Some((decision, application_id)) = query
        .data
        .as_deref()
        .and_then(|data| Decision::parse_key(data).ok())
    else {
        warn!(data = ?query.data, "Unrecognized callback data");
        return Ok(toast("Unknown action.".to_string(), false));
    };

    let endpoint = ChatEndpoint::parse(&query.from.id.to_string())
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let Some(admin) = state.directory().resolve_endpoint(&endpoint).await? else {
        return Ok(toast(NOT_CONNECTED.to_string(), true));
    };

    info!(
        %application_id,
        admin_id = %admin.admin_id,
        decision = decision.name(),
        "Processing decision"
    );

    Ok(
        match state
            .workflow()
            .decide_in_background(&application_id, decision, &admin.admin_id)
            .await
        {
            Ok(_) => toast(format!("Recorded: {}", decision.label()), false),
            Err(e) => toast(
                decision_refusal(&e).unwrap_or_else(|| "Something went wrong.".to_string()),
                true,
            ),
        },
    )
}

/// Answer a chat command. Plain text that is not a command is ignored.
async fn handle_message(state: &AppState, message: Message) -> Option<WebhookReply> {
    let command = ChatCommand::parse(message.text.as_deref()?)?;
    let chat_id = message.chat.id.to_string();
    let endpoint = ChatEndpoint::parse(&chat_id).ok()?;

    let text = state.commands().reply(&endpoint, command).await;
    Some(WebhookReply::SendMessage { chat_id, text })
}
