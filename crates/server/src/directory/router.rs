//! Assignment of new applications to admins.

use std::sync::Arc;

use tracing::{debug, instrument};

use verifydesk_core::{AdminId, AssignmentMode};

use crate::db::RecordStore;
use crate::models::Admin;
use crate::workflow::WorkflowError;

/// How the applicant asked to be routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingRequest {
    /// Pinned to one admin (the applicant opened that admin's link).
    Specific(AdminId),
    /// Least-loaded eligible admin.
    Auto,
}

impl RoutingRequest {
    /// Interpret the optional routing fields of a submission.
    ///
    /// An `admin_id` without an explicit mode means the applicant came
    /// through a personal link, so it is treated as specific. An explicit
    /// `auto` ignores any `admin_id`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAssignment` for `specific` without an `admin_id`.
    pub fn from_submission(
        admin_id: Option<AdminId>,
        mode: Option<AssignmentMode>,
    ) -> Result<Self, WorkflowError> {
        match (mode, admin_id) {
            (Some(AssignmentMode::Auto), _) | (None, None) => Ok(Self::Auto),
            (Some(AssignmentMode::Specific) | None, Some(id)) => Ok(Self::Specific(id)),
            (Some(AssignmentMode::Specific), None) => Err(WorkflowError::InvalidAssignment(
                "specific assignment requires an adminId".to_string(),
            )),
        }
    }

    /// Mode recorded on the created application.
    #[must_use]
    pub const fn mode(&self) -> AssignmentMode {
        match self {
            Self::Specific(_) => AssignmentMode::Specific,
            Self::Auto => AssignmentMode::Auto,
        }
    }
}

/// Picks the admin responsible for a new application.
///
/// Read-only: the router never persists the assignment.
#[derive(Clone)]
pub struct AdminRouter {
    store: Arc<dyn RecordStore>,
}

impl AdminRouter {
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Assign an admin.
    ///
    /// # Errors
    ///
    /// - `InvalidAssignment` if a specific admin is unknown or paused
    /// - `NoAdminsAvailable` if auto mode finds no active, connected admin
    /// - `Repository` if the store fails
    #[instrument(skip(self))]
    pub async fn assign(&self, request: &RoutingRequest) -> Result<Admin, WorkflowError> {
        match request {
            RoutingRequest::Specific(admin_id) => {
                let admin = self.store.get_admin(admin_id).await?.ok_or_else(|| {
                    WorkflowError::InvalidAssignment(format!("admin {admin_id} does not exist"))
                })?;
                if !admin.is_active() {
                    return Err(WorkflowError::InvalidAssignment(format!(
                        "admin {admin_id} is not accepting applications"
                    )));
                }
                Ok(admin)
            }
            RoutingRequest::Auto => {
                let mut candidates = Vec::new();
                for admin in self.store.list_active_admins().await? {
                    if !admin.is_auto_assignable() {
                        continue;
                    }
                    let load = self.store.admin_load(&admin.admin_id).await?;
                    debug!(admin_id = %admin.admin_id, load, "auto-assignment candidate");
                    candidates.push((admin, load));
                }
                select_least_loaded(candidates).ok_or(WorkflowError::NoAdminsAvailable)
            }
        }
    }
}

/// Minimum load wins; the earliest candidate wins ties.
#[must_use]
pub fn select_least_loaded(candidates: impl IntoIterator<Item = (Admin, i64)>) -> Option<Admin> {
    let mut best: Option<(Admin, i64)> = None;
    for (admin, load) in candidates {
        match &best {
            Some((_, best_load)) if *best_load <= load => {}
            _ => best = Some((admin, load)),
        }
    }
    best.map(|(admin, _)| admin)
}
