//! Unified error handling for the HTTP API.
//!
//! Every failure is answered with
//! `{"success": false, "error": "<code>", "message": "..."}`, where `code`
//! is stable and clients branch on it.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::directory::DirectoryError;
use crate::workflow::WorkflowError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or wrong credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: &'static str,
    message: String,
}

impl AppError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Workflow(e) => e.code(),
            Self::Directory(DirectoryError::NotFound(_)) | Self::NotFound(_) => "not_found",
            Self::Directory(DirectoryError::Invalid(_)) | Self::BadRequest(_) => "bad_request",
            Self::Directory(DirectoryError::Conflict(_) | DirectoryError::AlreadyConnected(_)) => {
                "conflict"
            }
            Self::Unauthorized(_) => "unauthorized",
            Self::Directory(DirectoryError::Repository(_))
            | Self::Database(_)
            | Self::Internal(_) => "internal",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Workflow(WorkflowError::NotFound(_))
            | Self::Directory(DirectoryError::NotFound(_))
            | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Workflow(WorkflowError::Forbidden(_)) => StatusCode::FORBIDDEN,
            Self::Workflow(WorkflowError::AlreadyDecided(_))
            | Self::Directory(DirectoryError::Conflict(_) | DirectoryError::AlreadyConnected(_)) => {
                StatusCode::CONFLICT
            }
            Self::Workflow(WorkflowError::InvalidAssignment(_))
            | Self::Directory(DirectoryError::Invalid(_))
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Workflow(WorkflowError::NoAdminsAvailable) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Workflow(WorkflowError::Repository(_))
            | Self::Directory(DirectoryError::Repository(_))
            | Self::Database(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            success: false,
            error: self.code(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
