//! In-process record store.
//!
//! Volatile; every conditional update runs under the write lock, which gives
//! the same compare-and-swap behaviour as the `PostgreSQL` `WHERE` guards.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use verifydesk_core::{
    AdminId, AdminStatus, ApplicationId, ChatEndpoint, CodeStage, PinStage, Stage,
};

use super::{RecordStore, RepositoryError};
use crate::models::{
    Admin, AdminStats, Application, MessageRef, NewAdmin, NewApplication, SystemStats,
};

#[derive(Debug, Default)]
struct Tables {
    admins: HashMap<AdminId, Admin>,
    applications: HashMap<ApplicationId, Application>,
}

impl Tables {
    fn sorted_admins(&self, active_only: bool) -> Vec<Admin> {
        let mut admins: Vec<Admin> = self
            .admins
            .values()
            .filter(|a| !active_only || a.is_active())
            .cloned()
            .collect();
        admins.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.admin_id.cmp(&b.admin_id))
        });
        admins
    }

    fn stats<'a>(applications: impl Iterator<Item = &'a Application>) -> (AdminStats, i64) {
        let mut stats = AdminStats::default();
        let mut rejected = 0;
        for app in applications {
            stats.total += 1;
            match app.pin_stage {
                PinStage::Pending => stats.pin_pending += 1,
                PinStage::Approved => stats.pin_approved += 1,
                PinStage::Rejected => rejected += 1,
            }
            if app.awaits_code_decision() {
                stats.code_pending += 1;
            }
            match app.code_stage {
                CodeStage::Approved => stats.fully_approved += 1,
                CodeStage::WrongPin | CodeStage::WrongCode
                    if app.pin_stage != PinStage::Rejected =>
                {
                    rejected += 1;
                }
                _ => {}
            }
        }
        (stats, rejected)
    }
}

/// Record store held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.admins.contains_key(&admin.admin_id) {
            return Err(RepositoryError::Conflict(format!(
                "admin {} already exists",
                admin.admin_id
            )));
        }

        let now = Utc::now();
        let record = Admin {
            admin_id: admin.admin_id,
            name: admin.name,
            email: admin.email,
            endpoint: None,
            status: AdminStatus::Active,
            created_at: now,
            updated_at: now,
        };
        tables
            .admins
            .insert(record.admin_id.clone(), record.clone());
        Ok(record)
    }

    async fn get_admin(&self, id: &AdminId) -> Result<Option<Admin>, RepositoryError> {
        Ok(self.tables.read().await.admins.get(id).cloned())
    }

    async fn list_admins(&self) -> Result<Vec<Admin>, RepositoryError> {
        Ok(self.tables.read().await.sorted_admins(false))
    }

    async fn list_active_admins(&self) -> Result<Vec<Admin>, RepositoryError> {
        Ok(self.tables.read().await.sorted_admins(true))
    }

    async fn find_admin_by_endpoint(
        &self,
        endpoint: &ChatEndpoint,
    ) -> Result<Option<Admin>, RepositoryError> {
        Ok(self
            .tables
            .read()
            .await
            .admins
            .values()
            .find(|a| a.endpoint.as_ref() == Some(endpoint))
            .cloned())
    }

    async fn set_admin_status(
        &self,
        id: &AdminId,
        status: AdminStatus,
    ) -> Result<Option<Admin>, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(tables.admins.get_mut(id).map(|admin| {
            admin.status = status;
            admin.updated_at = Utc::now();
            admin.clone()
        }))
    }

    async fn set_admin_endpoint(
        &self,
        id: &AdminId,
        endpoint: Option<&ChatEndpoint>,
    ) -> Result<Option<Admin>, RepositoryError> {
        let mut tables = self.tables.write().await;
        if let Some(endpoint) = endpoint {
            let taken = tables
                .admins
                .values()
                .any(|a| &a.admin_id != id && a.endpoint.as_ref() == Some(endpoint));
            if taken {
                return Err(RepositoryError::Conflict(
                    "chat endpoint is connected to another admin".to_string(),
                ));
            }
        }

        Ok(tables.admins.get_mut(id).map(|admin| {
            admin.endpoint = endpoint.cloned();
            admin.updated_at = Utc::now();
            admin.clone()
        }))
    }

    async fn claim_admin_endpoint(
        &self,
        id: &AdminId,
        endpoint: &ChatEndpoint,
    ) -> Result<Option<Admin>, RepositoryError> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .admins
            .values()
            .any(|a| &a.admin_id != id && a.endpoint.as_ref() == Some(endpoint));
        if taken {
            return Err(RepositoryError::Conflict(
                "chat endpoint is connected to another admin".to_string(),
            ));
        }

        Ok(tables
            .admins
            .get_mut(id)
            .filter(|admin| admin.endpoint.as_ref().is_none_or(|held| held == endpoint))
            .map(|admin| {
                admin.endpoint = Some(endpoint.clone());
                admin.updated_at = Utc::now();
                admin.clone()
            }))
    }

    async fn delete_admin(&self, id: &AdminId) -> Result<bool, RepositoryError> {
        Ok(self.tables.write().await.admins.remove(id).is_some())
    }

    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict(format!(
                "application {} already exists",
                application.id
            )));
        }

        let now = Utc::now();
        let record = Application {
            id: application.id,
            admin_id: application.admin_id,
            phone_number: application.phone_number,
            pin: application.pin,
            code: None,
            pin_stage: PinStage::Pending,
            code_stage: CodeStage::Pending,
            assignment_mode: application.assignment_mode,
            pin_prompt: None,
            code_prompt: None,
            created_at: now,
            updated_at: now,
        };
        tables
            .applications
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_application(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self.tables.read().await.applications.get(id).cloned())
    }

    async fn list_applications_for_admin(
        &self,
        admin_id: &AdminId,
    ) -> Result<Vec<Application>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut applications: Vec<Application> = tables
            .applications
            .values()
            .filter(|a| &a.admin_id == admin_id)
            .cloned()
            .collect();
        applications.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(applications)
    }

    async fn transition_pin_stage(
        &self,
        id: &ApplicationId,
        from: PinStage,
        to: PinStage,
    ) -> Result<Option<Application>, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .applications
            .get_mut(id)
            .filter(|app| app.pin_stage == from)
            .map(|app| {
                app.pin_stage = to;
                app.updated_at = Utc::now();
                app.clone()
            }))
    }

    async fn transition_code_stage(
        &self,
        id: &ApplicationId,
        from: CodeStage,
        to: CodeStage,
    ) -> Result<Option<Application>, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .applications
            .get_mut(id)
            .filter(|app| {
                app.code_stage == from && app.pin_stage == PinStage::Approved && app.code.is_some()
            })
            .map(|app| {
                app.code_stage = to;
                app.updated_at = Utc::now();
                app.clone()
            }))
    }

    async fn submit_code(
        &self,
        id: &ApplicationId,
        code: &str,
    ) -> Result<Option<Application>, RepositoryError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .applications
            .get_mut(id)
            .filter(|app| app.pin_stage == PinStage::Approved)
            .map(|app| {
                app.code = Some(code.to_owned());
                app.code_stage = CodeStage::Pending;
                app.code_prompt = None;
                app.updated_at = Utc::now();
                app.clone()
            }))
    }

    async fn set_prompt_ref(
        &self,
        id: &ApplicationId,
        stage: Stage,
        prompt: &MessageRef,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let app = tables
            .applications
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        match stage {
            Stage::Pin => app.pin_prompt = Some(prompt.clone()),
            Stage::Code => app.code_prompt = Some(prompt.clone()),
        }
        Ok(())
    }

    async fn admin_stats(&self, admin_id: &AdminId) -> Result<AdminStats, RepositoryError> {
        let tables = self.tables.read().await;
        let (stats, _) = Tables::stats(
            tables
                .applications
                .values()
                .filter(|a| &a.admin_id == admin_id),
        );
        Ok(stats)
    }

    async fn system_stats(&self) -> Result<SystemStats, RepositoryError> {
        let tables = self.tables.read().await;
        let (stats, total_rejected) = Tables::stats(tables.applications.values());
        Ok(SystemStats {
            total_admins: i64::try_from(tables.admins.len()).unwrap_or(i64::MAX),
            total_applications: stats.total,
            pin_pending: stats.pin_pending,
            pin_approved: stats.pin_approved,
            code_pending: stats.code_pending,
            fully_approved: stats.fully_approved,
            total_rejected,
        })
    }
}
