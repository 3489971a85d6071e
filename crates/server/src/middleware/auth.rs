//! Operator authentication.
//!
//! Privileged endpoints take a bearer token matching `OPERATOR_TOKEN`. When
//! no token is configured those endpoints do not exist as far as clients can
//! tell: they answer 404.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use secrecy::ExposeSecret;

use crate::error::AppError;
use crate::notify::slack::constant_time_compare;
use crate::state::AppState;

/// Extractor that requires the operator bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn stats(_: RequireOperator, State(state): State<AppState>) -> impl IntoResponse {
///     // only reached with a valid token
/// }
/// ```
pub struct RequireOperator;

impl FromRequestParts<AppState> for RequireOperator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config().operator_token.as_ref() else {
            return Err(AppError::NotFound(parts.uri.path().to_string()));
        };

        let presented = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        if constant_time_compare(presented.trim(), expected.expose_secret()) {
            Ok(Self)
        } else {
            Err(AppError::Unauthorized("invalid operator token".to_string()))
        }
    }
}
