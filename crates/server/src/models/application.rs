//! Application domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use verifydesk_core::{AdminId, ApplicationId, AssignmentMode, CodeStage, PinStage, Stage};

/// Handle to a chat message that can be edited later.
///
/// For Slack `channel` is the DM channel id and `message_id` the message
/// `ts`; for Telegram they are the chat id and message id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel: String,
    pub message_id: String,
}

/// One applicant's in-flight verification record.
///
/// Implements `Debug` manually so the submitted secrets never reach logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Application {
    pub id: ApplicationId,
    /// Owning admin. Set at creation and never changed; the admin may since
    /// have been removed.
    pub admin_id: AdminId,
    pub phone_number: String,
    pub pin: String,
    /// Latest submitted code, if any.
    pub code: Option<String>,
    pub pin_stage: PinStage,
    pub code_stage: CodeStage,
    pub assignment_mode: AssignmentMode,
    /// Prompt asking the admin to decide the pin.
    pub pin_prompt: Option<MessageRef>,
    /// Prompt asking the admin to decide the latest code.
    pub code_prompt: Option<MessageRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("id", &self.id)
            .field("admin_id", &self.admin_id)
            .field("phone_number", &self.phone_number)
            .field("pin", &"[REDACTED]")
            .field("code", &self.code.as_ref().map(|_| "[REDACTED]"))
            .field("pin_stage", &self.pin_stage)
            .field("code_stage", &self.code_stage)
            .field("assignment_mode", &self.assignment_mode)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

impl Application {
    /// Both stages, as served to the applicant.
    #[must_use]
    pub const fn status(&self) -> ApplicationStatus {
        ApplicationStatus {
            pin_stage: self.pin_stage,
            code_stage: self.code_stage,
        }
    }

    /// Counts toward the owning admin's load.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.pin_stage.is_pending() || self.awaits_code_decision()
    }

    /// Pin approved and the code stage still pending.
    #[must_use]
    pub const fn awaits_code_decision(&self) -> bool {
        matches!(self.pin_stage, PinStage::Approved) && self.code_stage.is_pending()
    }

    /// Prompt recorded for a stage.
    #[must_use]
    pub const fn prompt(&self, stage: Stage) -> Option<&MessageRef> {
        match stage {
            Stage::Pin => self.pin_prompt.as_ref(),
            Stage::Code => self.code_prompt.as_ref(),
        }
    }
}

/// Input for creating an application. Both stages start `Pending`.
#[derive(Clone)]
pub struct NewApplication {
    pub id: ApplicationId,
    pub admin_id: AdminId,
    pub phone_number: String,
    pub pin: String,
    pub assignment_mode: AssignmentMode,
}

impl std::fmt::Debug for NewApplication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewApplication")
            .field("id", &self.id)
            .field("admin_id", &self.admin_id)
            .field("phone_number", &self.phone_number)
            .field("pin", &"[REDACTED]")
            .field("assignment_mode", &self.assignment_mode)
            .finish()
    }
}

/// Snapshot of both stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationStatus {
    pub pin_stage: PinStage,
    pub code_stage: CodeStage,
}
