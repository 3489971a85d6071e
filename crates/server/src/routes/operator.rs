//! Admin directory management and statistics for the operator.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use verifydesk_core::{AdminId, ChatEndpoint};

use crate::error::AppError;
use crate::middleware::RequireOperator;
use crate::models::{Admin, AdminStats, SystemStats};
use crate::state::AppState;

use super::SuccessResponse;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/operator/admins",
            get(list_admins).post(add_admin),
        )
        .route("/api/operator/admins/{id}", delete(remove_admin))
        .route("/api/operator/admins/{id}/pause", post(pause_admin))
        .route("/api/operator/admins/{id}/unpause", post(unpause_admin))
        .route("/api/operator/admins/{id}/endpoint", put(connect_endpoint))
        .route("/api/operator/stats", get(stats))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAdminRequest {
    /// Chosen id; generated when absent.
    #[serde(default)]
    pub admin_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectEndpointRequest {
    /// Slack user id or Telegram chat id.
    pub endpoint: String,
}

#[derive(Debug, Serialize)]
pub struct AdminResponse {
    pub success: bool,
    pub admin: Admin,
    /// Personal application link.
    pub link: String,
}

#[derive(Debug, Serialize)]
pub struct AdminWithStats {
    #[serde(flatten)]
    pub admin: Admin,
    pub link: String,
    pub stats: AdminStats,
}

#[derive(Debug, Serialize)]
pub struct AdminListResponse {
    pub success: bool,
    pub admins: Vec<AdminWithStats>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub admin: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Stats {
    Admin { admin_id: AdminId, stats: AdminStats },
    System(SystemStats),
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: Stats,
}

fn admin_response(state: &AppState, admin: Admin) -> AdminResponse {
    AdminResponse {
        success: true,
        link: state.config().admin_link(admin.admin_id.as_str()),
        admin,
    }
}

#[instrument(skip_all)]
async fn add_admin(
    _operator: RequireOperator,
    State(state): State<AppState>,
    Json(body): Json<AddAdminRequest>,
) -> Result<(StatusCode, Json<AdminResponse>), AppError> {
    let admin = state
        .directory()
        .add_admin(body.admin_id.map(AdminId::new), &body.name, body.email)
        .await?;
    Ok((StatusCode::CREATED, Json(admin_response(&state, admin))))
}

async fn list_admins(
    _operator: RequireOperator,
    State(state): State<AppState>,
) -> Result<Json<AdminListResponse>, AppError> {
    let admins = state.directory().list_admins().await?;
    let mut rows = Vec::with_capacity(admins.len());
    for admin in admins {
        let stats = state.store().admin_stats(&admin.admin_id).await?;
        rows.push(AdminWithStats {
            link: state.config().admin_link(admin.admin_id.as_str()),
            admin,
            stats,
        });
    }
    Ok(Json(AdminListResponse {
        success: true,
        admins: rows,
    }))
}

#[instrument(skip(_operator, state))]
async fn pause_admin(
    _operator: RequireOperator,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AdminResponse>, AppError> {
    let admin = state.directory().pause_admin(&AdminId::new(id)).await?;
    Ok(Json(admin_response(&state, admin)))
}

#[instrument(skip(_operator, state))]
async fn unpause_admin(
    _operator: RequireOperator,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AdminResponse>, AppError> {
    let admin = state.directory().unpause_admin(&AdminId::new(id)).await?;
    Ok(Json(admin_response(&state, admin)))
}

/// Bind a chat endpoint to an admin without going through the bot.
#[instrument(skip(_operator, state))]
async fn connect_endpoint(
    _operator: RequireOperator,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ConnectEndpointRequest>,
) -> Result<Json<AdminResponse>, AppError> {
    let endpoint =
        ChatEndpoint::parse(&body.endpoint).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let admin = state
        .directory()
        .connect_endpoint(&AdminId::new(id), &endpoint)
        .await?;
    Ok(Json(admin_response(&state, admin)))
}

/// Remove an admin. Their applications stay, attributed to the old id.
#[instrument(skip(_operator, state))]
async fn remove_admin(
    _operator: RequireOperator,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.directory().remove_admin(&AdminId::new(id)).await?;
    Ok(Json(SuccessResponse::OK))
}

/// Desk-wide counters, or one admin's with `?admin=<id>`.
async fn stats(
    _operator: RequireOperator,
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, AppError> {
    let stats = match query.admin {
        Some(id) => {
            let admin = state.directory().get_admin(&AdminId::new(id)).await?;
            Stats::Admin {
                stats: state.store().admin_stats(&admin.admin_id).await?,
                admin_id: admin.admin_id,
            }
        }
        None => Stats::System(state.store().system_stats().await?),
    };
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}
