//! Events produced by successful workflow operations.

use verifydesk_core::{CodeDecision, PinDecision, Stage};

use crate::models::Application;

/// Something the owning admin should hear about. Each carries the record as
/// it was right after the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// A new application awaits a pin decision.
    NewApplication(Application),
    /// A code awaits a decision.
    CodeSubmitted(Application),
    /// The applicant asked for a fresh code.
    CodeResendRequested(Application),
    PinDecided {
        application: Application,
        decision: PinDecision,
    },
    CodeDecided {
        application: Application,
        decision: CodeDecision,
    },
}

impl WorkflowEvent {
    #[must_use]
    pub const fn application(&self) -> &Application {
        match self {
            Self::NewApplication(application)
            | Self::CodeSubmitted(application)
            | Self::CodeResendRequested(application)
            | Self::PinDecided { application, .. }
            | Self::CodeDecided { application, .. } => application,
        }
    }

    /// Events that ask the admin for a decision.
    #[must_use]
    pub const fn is_prompt(&self) -> bool {
        matches!(self, Self::NewApplication(_) | Self::CodeSubmitted(_))
    }

    /// Stage the event concerns, if any.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::NewApplication(_) | Self::PinDecided { .. } => Some(Stage::Pin),
            Self::CodeSubmitted(_) | Self::CodeDecided { .. } => Some(Stage::Code),
            Self::CodeResendRequested(_) => None,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NewApplication(_) => "new_application",
            Self::CodeSubmitted(_) => "code_submitted",
            Self::CodeResendRequested(_) => "code_resend_requested",
            Self::PinDecided { .. } => "pin_decided",
            Self::CodeDecided { .. } => "code_decided",
        }
    }
}
