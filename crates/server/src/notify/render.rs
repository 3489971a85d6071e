//! Transport-neutral wording of prompts and acknowledgements.
//!
//! Button labels come from the decision itself, so the label always names
//! the action the button performs.

use verifydesk_core::{AssignmentMode, CodeDecision, Decision, PinDecision, Stage};

use super::{Prompt, PromptField};
use crate::models::{Admin, Application};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

fn assignment_label(mode: AssignmentMode) -> &'static str {
    match mode {
        AssignmentMode::Specific => "Personal link",
        AssignmentMode::Auto => "Auto-assigned",
    }
}

/// Ask the owner to check a new application's phone number and PIN.
#[must_use]
pub fn pin_prompt(application: &Application) -> Prompt {
    Prompt {
        application_id: application.id.clone(),
        stage: Stage::Pin,
        title: "New application: verify PIN".to_string(),
        fields: vec![
            PromptField::new("Application", application.id.as_str()),
            PromptField::new("Phone", &application.phone_number),
            PromptField::new("PIN", &application.pin),
            PromptField::new("Assignment", assignment_label(application.assignment_mode)),
        ],
        actions: vec![
            Decision::Pin(PinDecision::Approve),
            Decision::Pin(PinDecision::Deny),
        ],
        footer: format!(
            "Submitted {}. Approve lets the applicant enter a code.",
            application.created_at.format(TIME_FORMAT)
        ),
    }
}

/// Ask the owner to check a submitted code.
#[must_use]
pub fn code_prompt(application: &Application) -> Prompt {
    Prompt {
        application_id: application.id.clone(),
        stage: Stage::Code,
        title: "Code submitted: verify code".to_string(),
        fields: vec![
            PromptField::new("Application", application.id.as_str()),
            PromptField::new("Phone", &application.phone_number),
            PromptField::new("Code", application.code.as_deref().unwrap_or("-")),
        ],
        actions: vec![
            Decision::Code(CodeDecision::Approve),
            Decision::Code(CodeDecision::WrongPin),
            Decision::Code(CodeDecision::WrongCode),
        ],
        footer: format!(
            "Submitted {}. Wrong PIN sends the applicant back to PIN entry.",
            application.updated_at.format(TIME_FORMAT)
        ),
    }
}

/// Replacement text for a decided pin prompt.
#[must_use]
pub fn pin_outcome(application: &Application, decision: PinDecision, admin: &Admin) -> String {
    let headline = match decision {
        PinDecision::Approve => "PIN approved. Waiting for the applicant's code.",
        PinDecision::Deny => "PIN denied. Application closed.",
    };
    format!(
        "{headline}\nApplication: {}\nPhone: {}\nDecided by {} at {}",
        application.id,
        application.phone_number,
        admin.name,
        application.updated_at.format(TIME_FORMAT)
    )
}

/// Replacement text for a decided code prompt.
#[must_use]
pub fn code_outcome(application: &Application, decision: CodeDecision, admin: &Admin) -> String {
    let headline = match decision {
        CodeDecision::Approve => "Code approved. Application fully approved.",
        CodeDecision::WrongPin => {
            "Marked wrong PIN. The applicant will re-enter the PIN as a new application."
        }
        CodeDecision::WrongCode => "Marked wrong code. The applicant will submit a new code.",
    };
    format!(
        "{headline}\nApplication: {}\nPhone: {}\nCode: {}\nDecided by {} at {}",
        application.id,
        application.phone_number,
        application.code.as_deref().unwrap_or("-"),
        admin.name,
        application.updated_at.format(TIME_FORMAT)
    )
}

#[must_use]
pub fn resend_request(application: &Application) -> String {
    format!(
        "Code resend requested\nApplication: {}\nPhone: {}\nThe applicant asked for a new code.",
        application.id, application.phone_number
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use verifydesk_core::{AdminId, AdminStatus, ApplicationId, CodeStage, PinStage};

    use super::*;

    fn application() -> Application {
        let now = Utc::now();
        Application {
            id: ApplicationId::new("APP-1"),
            admin_id: AdminId::new("ADM-1"),
            phone_number: "+15550001".to_string(),
            pin: "1234".to_string(),
            code: Some("482113".to_string()),
            pin_stage: PinStage::Approved,
            code_stage: CodeStage::Pending,
            assignment_mode: AssignmentMode::Auto,
            pin_prompt: None,
            code_prompt: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn admin() -> Admin {
        let now = Utc::now();
        Admin {
            admin_id: AdminId::new("ADM-1"),
            name: "Alice".to_string(),
            email: None,
            endpoint: None,
            status: AdminStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_pin_prompt_offers_pin_decisions_only() {
        let prompt = pin_prompt(&application());
        assert_eq!(prompt.stage, Stage::Pin);
        assert!(prompt.actions.iter().all(|d| d.stage() == Stage::Pin));
        assert!(prompt.plain_text().contains("PIN: 1234"));
    }

    #[test]
    fn test_code_prompt_shows_code() {
        let prompt = code_prompt(&application());
        assert_eq!(prompt.actions.len(), 3);
        assert!(prompt.plain_text().contains("Code: 482113"));
    }

    #[test]
    fn test_outcomes_name_the_decision() {
        let app = application();
        assert!(pin_outcome(&app, PinDecision::Deny, &admin()).starts_with("PIN denied"));
        let text = code_outcome(&app, CodeDecision::WrongCode, &admin());
        assert!(text.starts_with("Marked wrong code"));
        assert!(text.contains("Decided by Alice"));
    }
}
