//! Generic decision callback for integrations that are not a chat bot.
//!
//! The caller vouches for `actingAdminId` with the operator token; the
//! workflow still enforces ownership, sequencing, and idempotency.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use verifydesk_core::{AdminId, ApplicationId, CodeStage, Decision, PinStage, Stage};

use crate::error::AppError;
use crate::middleware::RequireOperator;
use crate::notify::DeliveryResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/decisions", post(decide))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub application_id: String,
    pub stage: Stage,
    pub decision: String,
    pub acting_admin_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    pub success: bool,
    pub pin_stage: PinStage,
    pub code_stage: CodeStage,
    pub delivery: DeliveryResult,
}

#[instrument(skip_all)]
async fn decide(
    _operator: RequireOperator,
    State(state): State<AppState>,
    Json(body): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, AppError> {
    let decision = Decision::from_parts(body.stage, &body.decision)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let outcome = state
        .workflow()
        .decide(
            &ApplicationId::new(body.application_id),
            decision,
            &AdminId::new(body.acting_admin_id),
        )
        .await?;

    Ok(Json(DecisionResponse {
        success: true,
        pin_stage: outcome.application.pin_stage,
        code_stage: outcome.application.code_stage,
        delivery: outcome.delivery,
    }))
}
