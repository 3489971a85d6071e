//! Public admin lookups for the applicant landing page.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde::Serialize;

use verifydesk_core::AdminId;

use crate::error::AppError;
use crate::models::Admin;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admins", get(list_admins))
        .route("/api/admins/{id}/validate", get(validate_admin))
}

/// What applicants may see of an admin.
#[derive(Debug, Serialize)]
pub struct PublicAdmin {
    pub id: AdminId,
    pub name: String,
}

impl From<Admin> for PublicAdmin {
    fn from(admin: Admin) -> Self {
        Self {
            id: admin.admin_id,
            name: admin.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminListResponse {
    pub success: bool,
    pub admins: Vec<PublicAdmin>,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub success: bool,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<PublicAdmin>,
}

async fn list_admins(State(state): State<AppState>) -> Result<Json<AdminListResponse>, AppError> {
    let admins = state.directory().list_active_admins().await?;
    Ok(Json(AdminListResponse {
        success: true,
        admins: admins.into_iter().map(PublicAdmin::from).collect(),
    }))
}

/// Whether a personal link still routes somewhere. Unknown and paused
/// admins are both reported as invalid.
async fn validate_admin(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ValidateResponse>, AppError> {
    let admin = state
        .directory()
        .validate_admin(&AdminId::new(id))
        .await?;
    Ok(Json(ValidateResponse {
        success: true,
        valid: admin.is_some(),
        admin: admin.map(PublicAdmin::from),
    }))
}
