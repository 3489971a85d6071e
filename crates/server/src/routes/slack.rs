//! Slack webhook handlers: decision button clicks and slash commands.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use tracing::{debug, info, instrument, warn};

use verifydesk_core::{ApplicationId, ChatEndpoint, Decision};

use crate::chat::{ChatCommand, NOT_CONNECTED, decision_refusal};
use crate::error::AppError;
use crate::notify::slack::{EphemeralResponse, InteractionPayload, SlackClient, SlashCommand};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/slack/interactions", post(handle_interaction))
        .route("/api/slack/commands", post(handle_command))
}

/// Check the signing headers and return the Slack client.
fn verify<'a>(
    state: &'a AppState,
    headers: &HeaderMap,
    body: &str,
) -> Result<&'a SlackClient, AppError> {
    let slack = state
        .slack()
        .ok_or_else(|| AppError::NotFound("Slack is not configured".into()))?;

    let timestamp = headers
        .get("X-Slack-Request-Timestamp")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing timestamp header".into()))?;

    let signature = headers
        .get("X-Slack-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature header".into()))?;

    slack
        .verify_signature(timestamp, body, signature)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    debug!("Slack signature verified");
    Ok(slack)
}

/// Handle a decision button click.
///
/// Answers 200 once the request is authentic, whatever the workflow says:
/// a successful decision edits the prompt in place, and a refused one is
/// explained to the clicker through `response_url`.
#[instrument(skip(state, headers, body))]
async fn handle_interaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, AppError> {
    let slack = verify(&state, &headers, &body)?;

    let payload = InteractionPayload::from_form(&body)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let action = payload
        .actions
        .first()
        .ok_or_else(|| AppError::BadRequest("No actions in payload".into()))?;

    let decision = Decision::parse_action_name(&action.action_id).map_err(|e| {
        warn!(action_id = %action.action_id, "Unknown action type");
        AppError::BadRequest(e.to_string())
    })?;

    let application_id = action
        .value
        .as_deref()
        .map(ApplicationId::new)
        .ok_or_else(|| AppError::BadRequest("Action has no application id".into()))?;

    let endpoint = ChatEndpoint::parse(&payload.user.id)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let reply = match state.directory().resolve_endpoint(&endpoint).await? {
        None => Some(NOT_CONNECTED.to_string()),
        Some(admin) => {
            info!(
                %application_id,
                admin_id = %admin.admin_id,
                decision = decision.name(),
                "Processing decision"
            );
            match state
                .workflow()
                .decide_in_background(&application_id, decision, &admin.admin_id)
                .await
            {
                Ok(_) => None,
                Err(e) => decision_refusal(&e),
            }
        }
    };

    if let Some(text) = reply
        && let Some(response_url) = payload.response_url
    {
        let slack = slack.clone();
        tokio::spawn(async move {
            if let Err(e) = slack.respond(&response_url, &text).await {
                warn!(error = %e, "Failed to send ephemeral reply");
            }
        });
    }

    Ok(StatusCode::OK)
}

/// Handle a slash command. The reply is returned inline and shown only to
/// the sender.
#[instrument(skip(state, headers, body))]
async fn handle_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<EphemeralResponse>, AppError> {
    verify(&state, &headers, &body)?;

    let command =
        SlashCommand::from_form(&body).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let endpoint = ChatEndpoint::parse(&command.user_id)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let reply = state
        .commands()
        .reply(&endpoint, ChatCommand::from_slash(&command.command, &command.text))
        .await;

    Ok(Json(EphemeralResponse::new(reply)))
}
