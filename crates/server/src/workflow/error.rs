//! Workflow errors.

use thiserror::Error;

use crate::db::RepositoryError;

/// Outcomes the applicant and admin clients branch on, plus store failures.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Unknown application or admin.
    #[error("not found: {0}")]
    NotFound(String),

    /// Acting admin does not own the application, or the step is out of
    /// sequence.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The stage already left `pending`.
    #[error("already decided: {0}")]
    AlreadyDecided(String),

    /// The explicitly requested admin cannot take applications.
    #[error("invalid assignment: {0}")]
    InvalidAssignment(String),

    #[error("no admins available")]
    NoAdminsAvailable,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl WorkflowError {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::AlreadyDecided(_) => "already_decided",
            Self::InvalidAssignment(_) => "invalid_assignment",
            Self::NoAdminsAvailable => "no_admins_available",
            Self::Repository(_) => "internal",
        }
    }
}
