//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness
//! GET  /health/ready                        - Store reachable
//!
//! # Applicant API
//! POST /api/applications                    - Submit phone number and PIN
//! GET  /api/applications/{id}/pin-status    - Poll the PIN stage
//! POST /api/applications/{id}/code          - Submit the verification code
//! GET  /api/applications/{id}/code-status   - Poll the code stage
//! GET  /api/applications/{id}/status        - Both stages
//! POST /api/applications/{id}/resend-code   - Ask the admin for a new code
//! GET  /api/admins                          - Active admins (picker)
//! GET  /api/admins/{id}/validate            - Check a personal link
//!
//! # Operator API (bearer token)
//! POST   /api/decisions                     - Decide on behalf of an admin
//! GET    /api/operator/admins               - All admins
//! POST   /api/operator/admins               - Add an admin
//! DELETE /api/operator/admins/{id}          - Remove an admin
//! POST   /api/operator/admins/{id}/pause    - Pause
//! POST   /api/operator/admins/{id}/unpause  - Unpause
//! PUT    /api/operator/admins/{id}/endpoint - Connect a chat endpoint
//! GET    /api/operator/stats                - Desk or per-admin counters
//!
//! # Chat callbacks
//! POST /api/slack/interactions              - Button clicks (signed)
//! POST /api/slack/commands                  - Slash commands (signed)
//! POST /api/telegram/webhook                - Bot updates (secret header)
//! ```

pub mod admins;
pub mod applications;
pub mod decisions;
pub mod health;
pub mod operator;
pub mod slack;
pub mod telegram;

use axum::Router;

use crate::state::AppState;

/// Build the complete router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(applications::router())
        .merge(admins::router())
        .merge(decisions::router())
        .merge(operator::router())
        .merge(slack::router())
        .merge(telegram::router())
}

/// Generic success body for operations with nothing else to report.
#[derive(Debug, serde::Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub const OK: Self = Self { success: true };
}
