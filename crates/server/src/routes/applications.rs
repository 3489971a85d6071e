//! Applicant-facing API.
//!
//! The application id is the only credential the applicant's browser
//! holds, so every read here is authorized by possession of the id.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use verifydesk_core::{AdminId, ApplicationId, AssignmentMode, CodeStage, PinStage};

use crate::directory::RoutingRequest;
use crate::error::AppError;
use crate::state::AppState;

use super::SuccessResponse;

const PIN_LEN: usize = 4;
const CODE_LEN: std::ops::RangeInclusive<usize> = 4..=8;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/applications", post(submit_application))
        .route("/api/applications/{id}/pin-status", get(pin_status))
        .route("/api/applications/{id}/code", post(submit_code))
        .route("/api/applications/{id}/code-status", get(code_status))
        .route("/api/applications/{id}/status", get(status))
        .route("/api/applications/{id}/resend-code", post(resend_code))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationRequest {
    pub phone_number: String,
    pub pin: String,
    #[serde(default)]
    pub admin_id: Option<String>,
    #[serde(default)]
    pub assignment_mode: Option<AssignmentMode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitApplicationResponse {
    pub success: bool,
    pub application_id: ApplicationId,
    pub assigned_admin_id: AdminId,
    pub assigned_admin_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitCodeRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct StageStatusResponse<S> {
    pub success: bool,
    pub status: S,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    pub application_id: ApplicationId,
    pub pin_stage: PinStage,
    pub code_stage: CodeStage,
}

#[derive(Debug, Serialize)]
pub struct ResendResponse {
    pub success: bool,
    /// Whether the admin was actually told.
    pub delivered: bool,
}

/// Create an application and prompt the assigned admin.
///
/// Delivery problems are logged but do not fail the request; the record
/// exists and the admin can still find it with `/pending`.
#[instrument(skip(state, body))]
async fn submit_application(
    State(state): State<AppState>,
    Json(body): Json<SubmitApplicationRequest>,
) -> Result<(StatusCode, Json<SubmitApplicationResponse>), AppError> {
    let phone_number = validate_phone_number(&body.phone_number)?;
    validate_pin(&body.pin)?;

    let admin_id = body
        .admin_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(AdminId::new);
    let routing = RoutingRequest::from_submission(admin_id, body.assignment_mode)?;

    let created = state
        .workflow()
        .create_application(phone_number, body.pin, &routing)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitApplicationResponse {
            success: true,
            application_id: created.application.id,
            assigned_admin_id: created.admin.admin_id,
            assigned_admin_name: created.admin.name,
        }),
    ))
}

async fn pin_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StageStatusResponse<PinStage>>, AppError> {
    let status = state
        .workflow()
        .get_status(&ApplicationId::new(id))
        .await?;
    Ok(Json(StageStatusResponse {
        success: true,
        status: status.pin_stage,
    }))
}

async fn code_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StageStatusResponse<CodeStage>>, AppError> {
    let status = state
        .workflow()
        .get_status(&ApplicationId::new(id))
        .await?;
    Ok(Json(StageStatusResponse {
        success: true,
        status: status.code_stage,
    }))
}

async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    let application_id = ApplicationId::new(id);
    let status = state.workflow().get_status(&application_id).await?;
    Ok(Json(StatusResponse {
        success: true,
        application_id,
        pin_stage: status.pin_stage,
        code_stage: status.code_stage,
    }))
}

#[instrument(skip(state, body))]
async fn submit_code(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SubmitCodeRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let code = body.code.trim();
    validate_code(code)?;
    state
        .workflow()
        .submit_code(&ApplicationId::new(id), code.to_string())
        .await?;
    Ok(Json(SuccessResponse::OK))
}

async fn resend_code(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResendResponse>, AppError> {
    let delivery = state
        .workflow()
        .request_code_resend(&ApplicationId::new(id))
        .await?;
    Ok(Json(ResendResponse {
        success: true,
        delivered: delivery.is_delivered(),
    }))
}

fn validate_phone_number(raw: &str) -> Result<String, AppError> {
    let phone_number = raw.trim();
    if phone_number.is_empty() {
        return Err(AppError::BadRequest("phoneNumber is required".into()));
    }
    Ok(phone_number.to_string())
}

fn all_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

fn validate_pin(pin: &str) -> Result<(), AppError> {
    if pin.len() == PIN_LEN && all_digits(pin) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "pin must be exactly {PIN_LEN} digits"
        )))
    }
}

fn validate_code(code: &str) -> Result<(), AppError> {
    if CODE_LEN.contains(&code.len()) && all_digits(code) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "code must be {} to {} digits",
            CODE_LEN.start(),
            CODE_LEN.end()
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_validation() {
        assert!(validate_pin("0000").is_ok());
        assert!(validate_pin("1234").is_ok());
        assert!(validate_pin("123").is_err());
        assert!(validate_pin("12345").is_err());
        assert!(validate_pin("12a4").is_err());
        // Non-ASCII digits are rejected even though they are numeric.
        assert!(validate_pin("١٢٣٤").is_err());
    }

    #[test]
    fn test_code_validation() {
        assert!(validate_code("4821").is_ok());
        assert!(validate_code("12345678").is_ok());
        assert!(validate_code("482").is_err());
        assert!(validate_code("123456789").is_err());
        assert!(validate_code("48 21").is_err());
    }

    #[test]
    fn test_phone_number_is_trimmed() {
        assert_eq!(
            validate_phone_number("  +255712345678 ").ok().as_deref(),
            Some("+255712345678")
        );
        assert!(validate_phone_number("   ").is_err());
    }

    #[test]
    fn test_request_uses_camel_case() {
        let body: SubmitApplicationRequest = serde_json::from_str(
            r#"{"phoneNumber":"+1","pin":"1234","adminId":"ADM-1","assignmentMode":"specific"}"#,
        )
        .unwrap();
        assert_eq!(body.admin_id.as_deref(), Some("ADM-1"));
        assert_eq!(body.assignment_mode, Some(AssignmentMode::Specific));
    }
}
