//! Record store for admins and applications.
//!
//! [`RecordStore`] is the only shared mutable state in the service. Two
//! backends implement it:
//!
//! - [`PgStore`] - `PostgreSQL` (schema `desk`), the production backend
//! - [`MemoryStore`] - in-process maps, for local development and tests
//!
//! # Tables
//!
//! - `desk.admin` - Admin directory (unique chat endpoint)
//! - `desk.application` - Applications and both stage columns
//!
//! # Conditional updates
//!
//! Stage changes are compare-and-swap operations: the update only applies if
//! the row still holds the expected stage, and the method returns `None`
//! otherwise. Two duplicate callbacks racing on the same application can
//! therefore never both succeed.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p verifydesk-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use verifydesk_core::{
    AdminId, AdminStatus, ApplicationId, ChatEndpoint, CodeStage, PinStage, Stage,
};

use crate::models::{
    Admin, AdminStats, Application, MessageRef, NewAdmin, NewApplication, SystemStats,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate admin id or endpoint).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Storage contract for admins and applications.
///
/// Lookups return `Ok(None)` for unknown ids. Mutations that target a single
/// row return the updated row, or `None` when the row is missing or its
/// guard did not match.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;

    // ---------------------------------------------------------------------
    // Admins
    // ---------------------------------------------------------------------

    /// Insert an admin. Fails with `Conflict` if the id is taken.
    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin, RepositoryError>;

    async fn get_admin(&self, id: &AdminId) -> Result<Option<Admin>, RepositoryError>;

    /// All admins, ordered by creation time then id.
    async fn list_admins(&self) -> Result<Vec<Admin>, RepositoryError>;

    /// Active admins in the same order as [`RecordStore::list_admins`].
    async fn list_active_admins(&self) -> Result<Vec<Admin>, RepositoryError>;

    async fn find_admin_by_endpoint(
        &self,
        endpoint: &ChatEndpoint,
    ) -> Result<Option<Admin>, RepositoryError>;

    async fn set_admin_status(
        &self,
        id: &AdminId,
        status: AdminStatus,
    ) -> Result<Option<Admin>, RepositoryError>;

    /// Bind (or with `None`, unbind) a chat endpoint. Fails with `Conflict`
    /// if another admin already holds the endpoint.
    async fn set_admin_endpoint(
        &self,
        id: &AdminId,
        endpoint: Option<&ChatEndpoint>,
    ) -> Result<Option<Admin>, RepositoryError>;

    /// Bind `endpoint` only if the admin has no endpoint yet or already has
    /// this one. Returns `None` when the admin is unknown or holds a
    /// different endpoint. Fails with `Conflict` if another admin holds it.
    async fn claim_admin_endpoint(
        &self,
        id: &AdminId,
        endpoint: &ChatEndpoint,
    ) -> Result<Option<Admin>, RepositoryError>;

    /// Remove an admin. Their applications are left untouched.
    async fn delete_admin(&self, id: &AdminId) -> Result<bool, RepositoryError>;

    // ---------------------------------------------------------------------
    // Applications
    // ---------------------------------------------------------------------

    /// Insert an application with both stages `Pending`. A single insert,
    /// so the record and its assignment appear together or not at all.
    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError>;

    async fn get_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError>;

    /// Applications owned by an admin, newest first.
    async fn list_applications_for_admin(
        &self,
        admin_id: &AdminId,
    ) -> Result<Vec<Application>, RepositoryError>;

    /// Move the pin stage from `from` to `to` if it still equals `from`.
    async fn transition_pin_stage(
        &self,
        id: &ApplicationId,
        from: PinStage,
        to: PinStage,
    ) -> Result<Option<Application>, RepositoryError>;

    /// Move the code stage from `from` to `to` if it still equals `from`,
    /// the pin stage is `Approved`, and a code has been submitted.
    async fn transition_code_stage(
        &self,
        id: &ApplicationId,
        from: CodeStage,
        to: CodeStage,
    ) -> Result<Option<Application>, RepositoryError>;

    /// Record a code and reset the code stage to `Pending`, from any code
    /// stage, if the pin stage is `Approved`.
    async fn submit_code(
        &self,
        id: &ApplicationId,
        code: &str,
    ) -> Result<Option<Application>, RepositoryError>;

    /// Remember the prompt message for a stage.
    async fn set_prompt_ref(
        &self,
        id: &ApplicationId,
        stage: Stage,
        prompt: &MessageRef,
    ) -> Result<(), RepositoryError>;

    // ---------------------------------------------------------------------
    // Statistics
    // ---------------------------------------------------------------------

    async fn admin_stats(&self, admin_id: &AdminId) -> Result<AdminStats, RepositoryError>;

    async fn system_stats(&self) -> Result<SystemStats, RepositoryError>;

    /// Open work items of an admin: pending pins plus pending codes after
    /// pin approval.
    async fn admin_load(&self, admin_id: &AdminId) -> Result<i64, RepositoryError> {
        Ok(self.admin_stats(admin_id).await?.load())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
