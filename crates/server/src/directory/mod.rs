//! Admin directory and routing.
//!
//! # Source of truth
//!
//! The record store is authoritative for every admin attribute. The only
//! in-memory structure is a `moka` cache from chat endpoint to admin id used
//! by [`AdminDirectory::resolve_endpoint`]; a cached entry is a hint that is
//! revalidated against the store on every hit and dropped when it no longer
//! matches.

pub mod router;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, info, instrument};

use verifydesk_core::{AdminId, AdminStatus, ChatEndpoint};

use crate::db::{RecordStore, RepositoryError};
use crate::models::{Admin, NewAdmin};

pub use router::{AdminRouter, RoutingRequest, select_least_loaded};

const MAX_ADMIN_ID_LENGTH: usize = 64;

/// Errors from admin directory management.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("admin not found: {0}")]
    NotFound(AdminId),

    #[error("invalid admin: {0}")]
    Invalid(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("admin {0} is already connected to another chat")]
    AlreadyConnected(AdminId),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for DirectoryError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Repository(other),
        }
    }
}

/// Roster management and acting-admin resolution.
#[derive(Clone)]
pub struct AdminDirectory {
    store: Arc<dyn RecordStore>,
    endpoint_hints: Cache<ChatEndpoint, AdminId>,
}

impl AdminDirectory {
    /// Create a directory whose endpoint hints expire after `hint_ttl`.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, hint_ttl: Duration) -> Self {
        let endpoint_hints = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(hint_ttl)
            .build();
        Self {
            store,
            endpoint_hints,
        }
    }

    /// Add an admin. A fresh `ADM-…` id is generated when none is given.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` for an empty name or malformed id and `Conflict`
    /// if the id is taken.
    #[instrument(skip(self, email))]
    pub async fn add_admin(
        &self,
        admin_id: Option<AdminId>,
        name: &str,
        email: Option<String>,
    ) -> Result<Admin, DirectoryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DirectoryError::Invalid("name cannot be empty".to_string()));
        }
        let admin_id = match admin_id {
            Some(id) => validate_admin_id(id)?,
            None => AdminId::generate(),
        };

        let admin = self
            .store
            .insert_admin(NewAdmin {
                admin_id,
                name: name.to_string(),
                email: email.filter(|e| !e.trim().is_empty()),
            })
            .await?;

        info!(admin_id = %admin.admin_id, "Admin added");
        Ok(admin)
    }

    /// Exclude an admin from new assignments and new prompts.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids.
    #[instrument(skip(self))]
    pub async fn pause_admin(&self, admin_id: &AdminId) -> Result<Admin, DirectoryError> {
        self.set_status(admin_id, AdminStatus::Paused).await
    }

    /// Make a paused admin eligible again.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids.
    #[instrument(skip(self))]
    pub async fn unpause_admin(&self, admin_id: &AdminId) -> Result<Admin, DirectoryError> {
        self.set_status(admin_id, AdminStatus::Active).await
    }

    async fn set_status(
        &self,
        admin_id: &AdminId,
        status: AdminStatus,
    ) -> Result<Admin, DirectoryError> {
        let admin = self
            .store
            .set_admin_status(admin_id, status)
            .await?
            .ok_or_else(|| DirectoryError::NotFound(admin_id.clone()))?;
        info!(admin_id = %admin_id, %status, "Admin status changed");
        Ok(admin)
    }

    /// Remove an admin. Their applications keep referring to the old id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids.
    #[instrument(skip(self))]
    pub async fn remove_admin(&self, admin_id: &AdminId) -> Result<(), DirectoryError> {
        let admin = self
            .store
            .get_admin(admin_id)
            .await?
            .ok_or_else(|| DirectoryError::NotFound(admin_id.clone()))?;

        if !self.store.delete_admin(admin_id).await? {
            return Err(DirectoryError::NotFound(admin_id.clone()));
        }
        if let Some(endpoint) = &admin.endpoint {
            self.endpoint_hints.invalidate(endpoint).await;
        }

        info!(admin_id = %admin_id, "Admin removed");
        Ok(())
    }

    /// Bind a chat endpoint to an admin (the admin "connects").
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids and `Conflict` if another admin
    /// holds the endpoint.
    #[instrument(skip(self))]
    pub async fn connect_endpoint(
        &self,
        admin_id: &AdminId,
        endpoint: &ChatEndpoint,
    ) -> Result<Admin, DirectoryError> {
        let previous = self
            .store
            .get_admin(admin_id)
            .await?
            .ok_or_else(|| DirectoryError::NotFound(admin_id.clone()))?;

        let admin = self
            .store
            .set_admin_endpoint(admin_id, Some(endpoint))
            .await?
            .ok_or_else(|| DirectoryError::NotFound(admin_id.clone()))?;

        if let Some(old) = previous.endpoint.filter(|old| old != endpoint) {
            self.endpoint_hints.invalidate(&old).await;
        }
        self.endpoint_hints
            .insert(endpoint.clone(), admin_id.clone())
            .await;

        info!(admin_id = %admin_id, "Admin connected chat endpoint");
        Ok(admin)
    }

    /// Connect the chat that sent `/start`. Unlike [`Self::connect_endpoint`]
    /// this never takes over an admin already bound to a different chat;
    /// moving an admin to a new chat is an operator action.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids, `AlreadyConnected` if the admin
    /// is bound to another chat and `Conflict` if another admin holds the
    /// endpoint.
    #[instrument(skip(self))]
    pub async fn claim_endpoint(
        &self,
        admin_id: &AdminId,
        endpoint: &ChatEndpoint,
    ) -> Result<Admin, DirectoryError> {
        if self.store.get_admin(admin_id).await?.is_none() {
            return Err(DirectoryError::NotFound(admin_id.clone()));
        }

        let admin = self
            .store
            .claim_admin_endpoint(admin_id, endpoint)
            .await?
            .ok_or_else(|| DirectoryError::AlreadyConnected(admin_id.clone()))?;

        self.endpoint_hints
            .insert(endpoint.clone(), admin_id.clone())
            .await;

        info!(admin_id = %admin_id, "Admin claimed chat endpoint");
        Ok(admin)
    }

    /// All admins, in routing order.
    ///
    /// # Errors
    ///
    /// Returns `Repository` if the store fails.
    pub async fn list_admins(&self) -> Result<Vec<Admin>, DirectoryError> {
        Ok(self.store.list_admins().await?)
    }

    /// Active admins, in routing order.
    ///
    /// # Errors
    ///
    /// Returns `Repository` if the store fails.
    pub async fn list_active_admins(&self) -> Result<Vec<Admin>, DirectoryError> {
        Ok(self.store.list_active_admins().await?)
    }

    /// The admin behind a personal link, if it can take applications.
    ///
    /// # Errors
    ///
    /// Returns `Repository` if the store fails.
    pub async fn validate_admin(&self, admin_id: &AdminId) -> Result<Option<Admin>, DirectoryError> {
        Ok(self
            .store
            .get_admin(admin_id)
            .await?
            .filter(Admin::is_active))
    }

    /// Look up an admin by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids.
    pub async fn get_admin(&self, admin_id: &AdminId) -> Result<Admin, DirectoryError> {
        self.store
            .get_admin(admin_id)
            .await?
            .ok_or_else(|| DirectoryError::NotFound(admin_id.clone()))
    }

    /// Identify the admin behind a chat endpoint.
    ///
    /// # Errors
    ///
    /// Returns `Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn resolve_endpoint(
        &self,
        endpoint: &ChatEndpoint,
    ) -> Result<Option<Admin>, DirectoryError> {
        if let Some(hinted) = self.endpoint_hints.get(endpoint).await {
            if let Some(admin) = self.store.get_admin(&hinted).await?
                && admin.endpoint.as_ref() == Some(endpoint)
            {
                return Ok(Some(admin));
            }
            debug!(admin_id = %hinted, "Dropping stale endpoint hint");
            self.endpoint_hints.invalidate(endpoint).await;
        }

        let admin = self.store.find_admin_by_endpoint(endpoint).await?;
        if let Some(admin) = &admin {
            self.endpoint_hints
                .insert(endpoint.clone(), admin.admin_id.clone())
                .await;
        }
        Ok(admin)
    }
}

fn validate_admin_id(id: AdminId) -> Result<AdminId, DirectoryError> {
    let raw = id.as_str();
    if raw.is_empty() || raw.len() > MAX_ADMIN_ID_LENGTH {
        return Err(DirectoryError::Invalid(format!(
            "admin id must be 1-{MAX_ADMIN_ID_LENGTH} characters"
        )));
    }
    if !raw
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(DirectoryError::Invalid(
            "admin id may only contain letters, digits, '-', '_' and '.'".to_string(),
        ));
    }
    Ok(id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn directory() -> (AdminDirectory, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let directory = AdminDirectory::new(store.clone(), Duration::from_secs(300));
        (directory, store)
    }

    #[tokio::test]
    async fn test_add_admin_generates_id() {
        let (directory, _) = directory();
        let admin = directory.add_admin(None, " Alice ", None).await.unwrap();
        assert!(admin.admin_id.as_str().starts_with("ADM-"));
        assert_eq!(admin.name, "Alice");
        assert!(admin.endpoint.is_none());
    }

    #[tokio::test]
    async fn test_add_admin_rejects_bad_ids() {
        let (directory, _) = directory();
        let result = directory
            .add_admin(Some(AdminId::new("has space")), "Alice", None)
            .await;
        assert!(matches!(result, Err(DirectoryError::Invalid(_))));

        let result = directory.add_admin(None, "   ", None).await;
        assert!(matches!(result, Err(DirectoryError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_pause_unknown_admin_is_not_found() {
        let (directory, _) = directory();
        let result = directory.pause_admin(&AdminId::new("ADM-nobody")).await;
        assert!(matches!(result, Err(DirectoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_validate_admin_excludes_paused() {
        let (directory, _) = directory();
        let id = AdminId::new("ADM-a");
        directory
            .add_admin(Some(id.clone()), "Alice", None)
            .await
            .unwrap();
        assert!(directory.validate_admin(&id).await.unwrap().is_some());

        directory.pause_admin(&id).await.unwrap();
        assert!(directory.validate_admin(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_endpoint_repairs_stale_hint() {
        let (directory, store) = directory();
        let a = AdminId::new("ADM-a");
        let b = AdminId::new("ADM-b");
        directory.add_admin(Some(a.clone()), "A", None).await.unwrap();
        directory.add_admin(Some(b.clone()), "B", None).await.unwrap();

        let endpoint = ChatEndpoint::parse("777").unwrap();
        directory.connect_endpoint(&a, &endpoint).await.unwrap();
        let resolved = directory.resolve_endpoint(&endpoint).await.unwrap().unwrap();
        assert_eq!(resolved.admin_id, a);

        // Move the endpoint behind the directory's back.
        store.set_admin_endpoint(&a, None).await.unwrap();
        store.set_admin_endpoint(&b, Some(&endpoint)).await.unwrap();

        let resolved = directory.resolve_endpoint(&endpoint).await.unwrap().unwrap();
        assert_eq!(resolved.admin_id, b);
    }

    #[tokio::test]
    async fn test_resolve_endpoint_after_removal() {
        let (directory, _) = directory();
        let a = AdminId::new("ADM-a");
        directory.add_admin(Some(a.clone()), "A", None).await.unwrap();
        let endpoint = ChatEndpoint::parse("777").unwrap();
        directory.connect_endpoint(&a, &endpoint).await.unwrap();

        directory.remove_admin(&a).await.unwrap();
        assert!(directory.resolve_endpoint(&endpoint).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connect_endpoint_conflict() {
        let (directory, _) = directory();
        let a = AdminId::new("ADM-a");
        let b = AdminId::new("ADM-b");
        directory.add_admin(Some(a.clone()), "A", None).await.unwrap();
        directory.add_admin(Some(b.clone()), "B", None).await.unwrap();
        let endpoint = ChatEndpoint::parse("777").unwrap();
        directory.connect_endpoint(&a, &endpoint).await.unwrap();

        let result = directory.connect_endpoint(&b, &endpoint).await;
        assert!(matches!(result, Err(DirectoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_claim_endpoint_never_moves_a_connected_admin() {
        let (directory, _) = directory();
        let a = AdminId::new("ADM-a");
        directory.add_admin(Some(a.clone()), "A", None).await.unwrap();
        let own = ChatEndpoint::parse("42").unwrap();
        let stranger = ChatEndpoint::parse("999").unwrap();

        directory.claim_endpoint(&a, &own).await.unwrap();
        // Repeating /start from the same chat is harmless.
        directory.claim_endpoint(&a, &own).await.unwrap();

        let result = directory.claim_endpoint(&a, &stranger).await;
        assert!(matches!(result, Err(DirectoryError::AlreadyConnected(_))));
        assert!(directory.resolve_endpoint(&stranger).await.unwrap().is_none());
        let owner = directory.resolve_endpoint(&own).await.unwrap().unwrap();
        assert_eq!(owner.admin_id, a);

        // The operator can still move the admin.
        directory.connect_endpoint(&a, &stranger).await.unwrap();
        assert!(directory.resolve_endpoint(&own).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_claim_endpoint_unknown_admin() {
        let (directory, _) = directory();
        let endpoint = ChatEndpoint::parse("42").unwrap();
        let result = directory
            .claim_endpoint(&AdminId::new("ADM-nobody"), &endpoint)
            .await;
        assert!(matches!(result, Err(DirectoryError::NotFound(_))));
    }
}
