//! Application state machine.
//!
//! Every operation follows the same order: validate against the current
//! record, commit the transition as a conditional update in the store, then
//! notify the owning admin. Notification never changes the operation's
//! result; its outcome is returned alongside for the caller to report.
//! [`Workflow::decide_in_background`] instead hands the notification to a
//! spawned task, for chat webhooks that must answer within a few seconds.
//!
//! Decisions are guarded twice. The ownership and sequencing checks read the
//! record (owner and pin approval never change back, so those reads cannot
//! go stale in a way that matters); the compare-and-swap in the store then
//! settles races between duplicate callbacks. A lost race is reported as
//! `AlreadyDecided` and produces no notification.

mod error;
mod event;

use std::sync::Arc;

use tracing::{Instrument, error, info, instrument};

use verifydesk_core::{
    AdminId, ApplicationId, CodeDecision, CodeStage, Decision, PinDecision, PinStage,
};

pub use error::WorkflowError;
pub use event::WorkflowEvent;

use crate::db::RecordStore;
use crate::directory::{AdminRouter, RoutingRequest};
use crate::models::{Admin, Application, ApplicationStatus, NewApplication};
use crate::notify::{DeliveryResult, Dispatcher};

/// Result of [`Workflow::create_application`].
#[derive(Debug, Clone)]
pub struct Created {
    pub application: Application,
    pub admin: Admin,
    pub delivery: DeliveryResult,
}

/// Result of a successful transition.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub application: Application,
    pub delivery: DeliveryResult,
}

#[derive(Clone)]
pub struct Workflow {
    store: Arc<dyn RecordStore>,
    router: AdminRouter,
    dispatcher: Dispatcher,
}

impl Workflow {
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, dispatcher: Dispatcher) -> Self {
        Self {
            router: AdminRouter::new(store.clone()),
            store,
            dispatcher,
        }
    }

    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Route and persist a new application, then prompt its admin.
    ///
    /// Nothing is written unless an admin was assigned.
    ///
    /// # Errors
    ///
    /// `InvalidAssignment`, `NoAdminsAvailable`, or `Repository`.
    #[instrument(skip(self, phone_number, pin))]
    pub async fn create_application(
        &self,
        phone_number: String,
        pin: String,
        routing: &RoutingRequest,
    ) -> Result<Created, WorkflowError> {
        let admin = self.router.assign(routing).await?;

        let application = self
            .store
            .insert_application(NewApplication {
                id: ApplicationId::generate(),
                admin_id: admin.admin_id.clone(),
                phone_number,
                pin,
                assignment_mode: routing.mode(),
            })
            .await?;

        info!(
            application_id = %application.id,
            admin_id = %admin.admin_id,
            mode = %application.assignment_mode,
            "Application created"
        );

        let delivery = self
            .dispatcher
            .notify(&admin, &WorkflowEvent::NewApplication(application.clone()))
            .await;

        Ok(Created {
            application,
            admin,
            delivery,
        })
    }

    /// Approve or deny the pin stage.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown application
    /// - `Forbidden` if `acting_admin` is not the owner
    /// - `AlreadyDecided` if the pin stage is no longer pending
    #[instrument(skip(self), fields(stage = "pin"))]
    pub async fn decide_pin_stage(
        &self,
        application_id: &ApplicationId,
        decision: PinDecision,
        acting_admin: &AdminId,
    ) -> Result<Outcome, WorkflowError> {
        let event = self
            .commit_pin_decision(application_id, decision, acting_admin)
            .await?;
        Ok(self.notify_committed(event).await)
    }

    async fn commit_pin_decision(
        &self,
        application_id: &ApplicationId,
        decision: PinDecision,
        acting_admin: &AdminId,
    ) -> Result<WorkflowEvent, WorkflowError> {
        let application = self.load(application_id).await?;
        ensure_owner(&application, acting_admin)?;

        let target = application
            .pin_stage
            .apply(decision)
            .map_err(|e| WorkflowError::AlreadyDecided(e.to_string()))?;

        let updated = self
            .store
            .transition_pin_stage(application_id, PinStage::Pending, target)
            .await?
            .ok_or_else(|| already_decided(application_id, "pin"))?;

        info!(pin_stage = %updated.pin_stage, "Pin stage decided");

        Ok(WorkflowEvent::PinDecided {
            application: updated,
            decision,
        })
    }

    /// Record a code for an application whose pin was approved and prompt
    /// the owner to check it. Resets the code stage to pending from any
    /// code stage.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown application
    /// - `Forbidden` if the pin stage is not approved
    #[instrument(skip(self, code))]
    pub async fn submit_code(
        &self,
        application_id: &ApplicationId,
        code: String,
    ) -> Result<Outcome, WorkflowError> {
        let application = self.load(application_id).await?;
        ensure_pin_approved(&application)?;

        let updated = self
            .store
            .submit_code(application_id, &code)
            .await?
            .ok_or_else(|| {
                WorkflowError::Forbidden(format!("pin of {application_id} is not approved"))
            })?;

        info!("Code submitted");

        let delivery = self
            .notify_owner(WorkflowEvent::CodeSubmitted(updated.clone()))
            .await;

        Ok(Outcome {
            application: updated,
            delivery,
        })
    }

    /// Approve the code, or flag a wrong pin or wrong code.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown application
    /// - `Forbidden` if `acting_admin` is not the owner, the pin is not
    ///   approved, or no code was submitted
    /// - `AlreadyDecided` if the code stage is no longer pending
    #[instrument(skip(self), fields(stage = "code"))]
    pub async fn decide_code_stage(
        &self,
        application_id: &ApplicationId,
        decision: CodeDecision,
        acting_admin: &AdminId,
    ) -> Result<Outcome, WorkflowError> {
        let event = self
            .commit_code_decision(application_id, decision, acting_admin)
            .await?;
        Ok(self.notify_committed(event).await)
    }

    async fn commit_code_decision(
        &self,
        application_id: &ApplicationId,
        decision: CodeDecision,
        acting_admin: &AdminId,
    ) -> Result<WorkflowEvent, WorkflowError> {
        let application = self.load(application_id).await?;
        ensure_owner(&application, acting_admin)?;
        ensure_pin_approved(&application)?;
        if application.code.is_none() {
            return Err(WorkflowError::Forbidden(format!(
                "no code has been submitted for {application_id}"
            )));
        }

        let target = application
            .code_stage
            .apply(decision)
            .map_err(|e| WorkflowError::AlreadyDecided(e.to_string()))?;

        let updated = self
            .store
            .transition_code_stage(application_id, CodeStage::Pending, target)
            .await?
            .ok_or_else(|| already_decided(application_id, "code"))?;

        info!(code_stage = %updated.code_stage, "Code stage decided");

        Ok(WorkflowEvent::CodeDecided {
            application: updated,
            decision,
        })
    }

    /// Apply a decision from either stage. Entry point for chat callbacks,
    /// which carry the stage inside the decision.
    ///
    /// # Errors
    ///
    /// As [`Self::decide_pin_stage`] or [`Self::decide_code_stage`].
    pub async fn decide(
        &self,
        application_id: &ApplicationId,
        decision: Decision,
        acting_admin: &AdminId,
    ) -> Result<Outcome, WorkflowError> {
        match decision {
            Decision::Pin(d) => self.decide_pin_stage(application_id, d, acting_admin).await,
            Decision::Code(d) => {
                self.decide_code_stage(application_id, d, acting_admin)
                    .await
            }
        }
    }

    /// Apply a decision and acknowledge it to the owner from a spawned task.
    ///
    /// Returns once the transition is committed, so a slow or retrying chat
    /// transport cannot hold up the caller.
    ///
    /// # Errors
    ///
    /// As [`Self::decide`].
    #[instrument(skip(self))]
    pub async fn decide_in_background(
        &self,
        application_id: &ApplicationId,
        decision: Decision,
        acting_admin: &AdminId,
    ) -> Result<Application, WorkflowError> {
        let event = match decision {
            Decision::Pin(d) => {
                self.commit_pin_decision(application_id, d, acting_admin)
                    .await?
            }
            Decision::Code(d) => {
                self.commit_code_decision(application_id, d, acting_admin)
                    .await?
            }
        };
        let application = event.application().clone();

        let workflow = self.clone();
        tokio::spawn(
            async move {
                workflow.notify_owner(event).await;
            }
            .in_current_span(),
        );

        Ok(application)
    }

    /// Both stages of an application. Reads go straight to the store.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown application.
    pub async fn get_status(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicationStatus, WorkflowError> {
        Ok(self.load(application_id).await?.status())
    }

    /// Tell the owner the applicant is asking for a new code. No state
    /// changes.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown application
    /// - `Forbidden` if the pin stage is not approved
    #[instrument(skip(self))]
    pub async fn request_code_resend(
        &self,
        application_id: &ApplicationId,
    ) -> Result<DeliveryResult, WorkflowError> {
        let application = self.load(application_id).await?;
        ensure_pin_approved(&application)?;
        Ok(self
            .notify_owner(WorkflowEvent::CodeResendRequested(application))
            .await)
    }

    async fn load(&self, application_id: &ApplicationId) -> Result<Application, WorkflowError> {
        self.store
            .get_application(application_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("application {application_id}")))
    }

    async fn notify_committed(&self, event: WorkflowEvent) -> Outcome {
        let application = event.application().clone();
        let delivery = self.notify_owner(event).await;
        Outcome {
            application,
            delivery,
        }
    }

    /// Deliver an event to the application's owner, who may since have been
    /// removed.
    async fn notify_owner(&self, event: WorkflowEvent) -> DeliveryResult {
        let admin_id = &event.application().admin_id;
        match self.store.get_admin(admin_id).await {
            Ok(Some(admin)) => self.dispatcher.notify(&admin, &event).await,
            Ok(None) => {
                info!(%admin_id, "Owning admin no longer exists; notification not sent");
                DeliveryResult::Unreachable
            }
            Err(e) => {
                error!(%admin_id, error = %e, "Failed to load owning admin for notification");
                DeliveryResult::Failed {
                    attempts: 0,
                    error: e.to_string(),
                }
            }
        }
    }
}

fn ensure_owner(application: &Application, acting_admin: &AdminId) -> Result<(), WorkflowError> {
    if application.admin_id == *acting_admin {
        Ok(())
    } else {
        Err(WorkflowError::Forbidden(format!(
            "application {} is not assigned to {acting_admin}",
            application.id
        )))
    }
}

fn ensure_pin_approved(application: &Application) -> Result<(), WorkflowError> {
    if application.pin_stage == PinStage::Approved {
        Ok(())
    } else {
        Err(WorkflowError::Forbidden(format!(
            "pin stage of {} is {}, not approved",
            application.id, application.pin_stage
        )))
    }
}

fn already_decided(application_id: &ApplicationId, stage: &str) -> WorkflowError {
    WorkflowError::AlreadyDecided(format!(
        "{stage} stage of {application_id} was decided concurrently"
    ))
}
