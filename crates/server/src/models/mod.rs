//! Domain models for the verification desk.
//!
//! Store backends convert their rows into these types; everything above the
//! store works only with them.

pub mod admin;
pub mod application;

pub use admin::{Admin, NewAdmin};
pub use application::{Application, ApplicationStatus, MessageRef, NewApplication};

use serde::Serialize;

/// Per-admin workload and outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdminStats {
    /// All applications ever assigned to the admin.
    pub total: i64,
    /// Waiting for a pin decision.
    pub pin_pending: i64,
    /// Pin approved (whatever happened to the code afterwards).
    pub pin_approved: i64,
    /// Pin approved and waiting for a code decision.
    pub code_pending: i64,
    /// Code approved.
    pub fully_approved: i64,
}

impl AdminStats {
    /// Open work items: the quantity auto-assignment balances.
    #[must_use]
    pub const fn load(&self) -> i64 {
        self.pin_pending + self.code_pending
    }
}

/// Desk-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SystemStats {
    pub total_admins: i64,
    pub total_applications: i64,
    pub pin_pending: i64,
    pub pin_approved: i64,
    pub code_pending: i64,
    pub fully_approved: i64,
    /// Pin rejected, wrong pin, or wrong code.
    pub total_rejected: i64,
}
