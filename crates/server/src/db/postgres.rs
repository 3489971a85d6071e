//! `PostgreSQL` record store.
//!
//! Queries are checked at runtime (`sqlx::query_as`) so the crate builds
//! without a live database. Stage changes are single conditional `UPDATE`
//! statements; the `WHERE` clause is the guard.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use verifydesk_core::{
    AdminId, AdminStatus, ApplicationId, AssignmentMode, ChatEndpoint, CodeStage, PinStage, Stage,
};

use super::{RecordStore, RepositoryError};
use crate::models::{
    Admin, AdminStats, Application, MessageRef, NewAdmin, NewApplication, SystemStats,
};

/// Embedded migrations from `crates/server/migrations`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const ADMIN_COLUMNS: &str = "admin_id, name, email, chat_endpoint, status, created_at, updated_at";

const APPLICATION_COLUMNS: &str = "id, admin_id, phone_number, pin, code, pin_stage, code_stage, \
     assignment_mode, pin_prompt_channel, pin_prompt_message_id, code_prompt_channel, \
     code_prompt_message_id, created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct AdminRow {
    admin_id: String,
    name: String,
    email: Option<String>,
    chat_endpoint: Option<String>,
    status: AdminStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AdminRow> for Admin {
    type Error = RepositoryError;

    fn try_from(row: AdminRow) -> Result<Self, Self::Error> {
        let endpoint = row
            .chat_endpoint
            .as_deref()
            .map(ChatEndpoint::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid chat endpoint in database: {e}"))
            })?;

        Ok(Self {
            admin_id: AdminId::new(row.admin_id),
            name: row.name,
            email: row.email,
            endpoint,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    id: String,
    admin_id: String,
    phone_number: String,
    pin: String,
    code: Option<String>,
    pin_stage: PinStage,
    code_stage: CodeStage,
    assignment_mode: AssignmentMode,
    pin_prompt_channel: Option<String>,
    pin_prompt_message_id: Option<String>,
    code_prompt_channel: Option<String>,
    code_prompt_message_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn message_ref(channel: Option<String>, message_id: Option<String>) -> Option<MessageRef> {
    match (channel, message_id) {
        (Some(channel), Some(message_id)) => Some(MessageRef {
            channel,
            message_id,
        }),
        _ => None,
    }
}

impl From<ApplicationRow> for Application {
    fn from(row: ApplicationRow) -> Self {
        Self {
            id: ApplicationId::new(row.id),
            admin_id: AdminId::new(row.admin_id),
            phone_number: row.phone_number,
            pin: row.pin,
            code: row.code,
            pin_stage: row.pin_stage,
            code_stage: row.code_stage,
            assignment_mode: row.assignment_mode,
            pin_prompt: message_ref(row.pin_prompt_channel, row.pin_prompt_message_id),
            code_prompt: message_ref(row.code_prompt_channel, row.code_prompt_message_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    total: i64,
    pin_pending: i64,
    pin_approved: i64,
    code_pending: i64,
    fully_approved: i64,
    total_rejected: i64,
}

const STATS_SELECT: &str = "COUNT(*) AS total, \
     COUNT(*) FILTER (WHERE pin_stage = 'pending') AS pin_pending, \
     COUNT(*) FILTER (WHERE pin_stage = 'approved') AS pin_approved, \
     COUNT(*) FILTER (WHERE pin_stage = 'approved' AND code_stage = 'pending') AS code_pending, \
     COUNT(*) FILTER (WHERE code_stage = 'approved') AS fully_approved, \
     COUNT(*) FILTER (WHERE pin_stage = 'rejected' OR code_stage IN ('wrong_pin', 'wrong_code')) AS total_rejected";

/// Map unique violations to `Conflict`, everything else to `Database`.
fn conflict_or_database(e: sqlx::Error, what: &str) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(what.to_string())
        }
        _ => RepositoryError::Database(e),
    }
}

// =============================================================================
// Store
// =============================================================================

/// Record store backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns the migration error if any migration fails.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        MIGRATOR.run(&self.pool).await
    }

    async fn fetch_admin(
        &self,
        query: &str,
        id: &AdminId,
    ) -> Result<Option<Admin>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            "INSERT INTO desk.admin (admin_id, name, email) VALUES ($1, $2, $3) \
             RETURNING {ADMIN_COLUMNS}"
        ))
        .bind(admin.admin_id.as_str())
        .bind(&admin.name)
        .bind(admin.email.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, &format!("admin {} already exists", admin.admin_id)))?;

        row.try_into()
    }

    async fn get_admin(&self, id: &AdminId) -> Result<Option<Admin>, RepositoryError> {
        self.fetch_admin(
            &format!("SELECT {ADMIN_COLUMNS} FROM desk.admin WHERE admin_id = $1"),
            id,
        )
        .await
    }

    async fn list_admins(&self) -> Result<Vec<Admin>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM desk.admin ORDER BY created_at, admin_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_active_admins(&self) -> Result<Vec<Admin>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM desk.admin WHERE status = 'active' \
             ORDER BY created_at, admin_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_admin_by_endpoint(
        &self,
        endpoint: &ChatEndpoint,
    ) -> Result<Option<Admin>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM desk.admin WHERE chat_endpoint = $1"
        ))
        .bind(endpoint.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn set_admin_status(
        &self,
        id: &AdminId,
        status: AdminStatus,
    ) -> Result<Option<Admin>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            "UPDATE desk.admin SET status = $2, updated_at = NOW() WHERE admin_id = $1 \
             RETURNING {ADMIN_COLUMNS}"
        ))
        .bind(id.as_str())
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn set_admin_endpoint(
        &self,
        id: &AdminId,
        endpoint: Option<&ChatEndpoint>,
    ) -> Result<Option<Admin>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            "UPDATE desk.admin SET chat_endpoint = $2, updated_at = NOW() WHERE admin_id = $1 \
             RETURNING {ADMIN_COLUMNS}"
        ))
        .bind(id.as_str())
        .bind(endpoint.map(ChatEndpoint::as_str))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "chat endpoint is connected to another admin"))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn claim_admin_endpoint(
        &self,
        id: &AdminId,
        endpoint: &ChatEndpoint,
    ) -> Result<Option<Admin>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            "UPDATE desk.admin SET chat_endpoint = $2, updated_at = NOW() \
             WHERE admin_id = $1 AND (chat_endpoint IS NULL OR chat_endpoint = $2) \
             RETURNING {ADMIN_COLUMNS}"
        ))
        .bind(id.as_str())
        .bind(endpoint.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "chat endpoint is connected to another admin"))?;

        row.map(TryInto::try_into).transpose()
    }

    async fn delete_admin(&self, id: &AdminId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM desk.admin WHERE admin_id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "INSERT INTO desk.application (id, admin_id, phone_number, pin, assignment_mode) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(application.id.as_str())
        .bind(application.admin_id.as_str())
        .bind(&application.phone_number)
        .bind(&application.pin)
        .bind(application.assignment_mode)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            conflict_or_database(e, &format!("application {} already exists", application.id))
        })?;

        Ok(row.into())
    }

    async fn get_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM desk.application WHERE id = $1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_applications_for_admin(
        &self,
        admin_id: &AdminId,
    ) -> Result<Vec<Application>, RepositoryError> {
        let rows = sqlx::query_as::<_, ApplicationRow>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM desk.application WHERE admin_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(admin_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn transition_pin_stage(
        &self,
        id: &ApplicationId,
        from: PinStage,
        to: PinStage,
    ) -> Result<Option<Application>, RepositoryError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "UPDATE desk.application SET pin_stage = $3, updated_at = NOW() \
             WHERE id = $1 AND pin_stage = $2 \
             RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(id.as_str())
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn transition_code_stage(
        &self,
        id: &ApplicationId,
        from: CodeStage,
        to: CodeStage,
    ) -> Result<Option<Application>, RepositoryError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "UPDATE desk.application SET code_stage = $3, updated_at = NOW() \
             WHERE id = $1 AND code_stage = $2 \
               AND pin_stage = 'approved' AND code IS NOT NULL \
             RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(id.as_str())
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn submit_code(
        &self,
        id: &ApplicationId,
        code: &str,
    ) -> Result<Option<Application>, RepositoryError> {
        let row = sqlx::query_as::<_, ApplicationRow>(&format!(
            "UPDATE desk.application \
             SET code = $2, code_stage = 'pending', \
                 code_prompt_channel = NULL, code_prompt_message_id = NULL, \
                 updated_at = NOW() \
             WHERE id = $1 AND pin_stage = 'approved' \
             RETURNING {APPLICATION_COLUMNS}"
        ))
        .bind(id.as_str())
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn set_prompt_ref(
        &self,
        id: &ApplicationId,
        stage: Stage,
        prompt: &MessageRef,
    ) -> Result<(), RepositoryError> {
        let query = match stage {
            Stage::Pin => {
                "UPDATE desk.application \
                 SET pin_prompt_channel = $2, pin_prompt_message_id = $3 WHERE id = $1"
            }
            Stage::Code => {
                "UPDATE desk.application \
                 SET code_prompt_channel = $2, code_prompt_message_id = $3 WHERE id = $1"
            }
        };

        let result = sqlx::query(query)
            .bind(id.as_str())
            .bind(&prompt.channel)
            .bind(&prompt.message_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn admin_stats(&self, admin_id: &AdminId) -> Result<AdminStats, RepositoryError> {
        let row = sqlx::query_as::<_, StatsRow>(&format!(
            "SELECT {STATS_SELECT} FROM desk.application WHERE admin_id = $1"
        ))
        .bind(admin_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(AdminStats {
            total: row.total,
            pin_pending: row.pin_pending,
            pin_approved: row.pin_approved,
            code_pending: row.code_pending,
            fully_approved: row.fully_approved,
        })
    }

    async fn system_stats(&self) -> Result<SystemStats, RepositoryError> {
        let row = sqlx::query_as::<_, StatsRow>(&format!(
            "SELECT {STATS_SELECT} FROM desk.application"
        ))
        .fetch_one(&self.pool)
        .await?;

        let total_admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM desk.admin")
            .fetch_one(&self.pool)
            .await?;

        Ok(SystemStats {
            total_admins,
            total_applications: row.total,
            pin_pending: row.pin_pending,
            pin_approved: row.pin_approved,
            code_pending: row.code_pending,
            fully_approved: row.fully_approved,
            total_rejected: row.total_rejected,
        })
    }
}
