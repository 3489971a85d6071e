//! Admin domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use verifydesk_core::{AdminId, AdminStatus, ChatEndpoint};

/// A reviewer who decides applications assigned to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Admin {
    /// Routing key, immutable once assigned.
    pub admin_id: AdminId,
    /// Display name.
    pub name: String,
    /// Display-only contact address.
    pub email: Option<String>,
    /// Where the admin receives prompts. `None` until the admin connects.
    pub endpoint: Option<ChatEndpoint>,
    /// Availability.
    pub status: AdminStatus,
    /// When the admin was created.
    pub created_at: DateTime<Utc>,
    /// When the admin was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Admin {
    /// Active, regardless of reachability.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, AdminStatus::Active)
    }

    /// Eligible for auto-assignment: active and connected.
    #[must_use]
    pub const fn is_auto_assignable(&self) -> bool {
        self.is_active() && self.endpoint.is_some()
    }
}

/// Input for creating an admin.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub admin_id: AdminId,
    pub name: String,
    pub email: Option<String>,
}
