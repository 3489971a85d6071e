//! Status enums and the per-stage transition rules.
//!
//! An application moves along two tracks. The pin track decides whether the
//! submitted phone number and pin are genuine; the code track, reachable only
//! once the pin track is `Approved`, decides on the one-time code.
//!
//! ```text
//! pin:   pending --approve--> approved
//!        pending --deny-----> rejected
//!
//! code:  pending --approve-----> approved
//!        pending --wrong_pin---> wrong_pin
//!        pending --wrong_code--> wrong_code
//!
//!        any code stage --submit code--> pending
//! ```
//!
//! Only `Pending` accepts a decision. Once the pin is approved, a submitted
//! code always resets the code track to `Pending`. Everything here is pure; stores apply
//! the same rules as conditional updates.

use serde::{Deserialize, Serialize};

use super::decision::{CodeDecision, PinDecision};

/// Error returned when a decision is applied to a stage that already left
/// `Pending`.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The pin stage was already decided.
    #[error("pin stage already decided: {0}")]
    PinAlreadyDecided(PinStage),
    /// The code stage was already decided.
    #[error("code stage already decided: {0}")]
    CodeAlreadyDecided(CodeStage),
}

/// Pin-stage status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "desk.pin_stage", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PinStage {
    /// Waiting for the admin.
    #[default]
    Pending,
    /// Phone number and pin accepted; the applicant may enter a code.
    Approved,
    /// Application denied. A retry needs a new application.
    Rejected,
}

impl PinStage {
    /// Whether the admin may still decide this stage.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Apply an admin decision.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::PinAlreadyDecided`] unless the stage is
    /// `Pending`.
    pub const fn apply(self, decision: PinDecision) -> Result<Self, TransitionError> {
        match self {
            Self::Pending => Ok(decision.target()),
            decided => Err(TransitionError::PinAlreadyDecided(decided)),
        }
    }

    /// Stable snake_case name, as stored and as served to clients.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for PinStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PinStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("invalid pin stage: {s}")),
        }
    }
}

/// Code-stage status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "desk.code_stage", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum CodeStage {
    /// Waiting for a code or for the admin's verdict on it.
    #[default]
    Pending,
    /// Code accepted; the application is fully approved.
    Approved,
    /// The pin turned out to be wrong. The applicant goes back to pin entry,
    /// which creates a new application.
    WrongPin,
    /// The code was wrong. The applicant may resubmit on the same record.
    WrongCode,
}

impl CodeStage {
    /// Whether the admin may still decide this stage.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Apply an admin decision.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::CodeAlreadyDecided`] unless the stage is
    /// `Pending`.
    pub const fn apply(self, decision: CodeDecision) -> Result<Self, TransitionError> {
        match self {
            Self::Pending => Ok(decision.target()),
            decided => Err(TransitionError::CodeAlreadyDecided(decided)),
        }
    }

    /// Stable snake_case name, as stored and as served to clients.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::WrongPin => "wrong_pin",
            Self::WrongCode => "wrong_code",
        }
    }
}

impl std::fmt::Display for CodeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CodeStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "wrong_pin" => Ok(Self::WrongPin),
            "wrong_code" => Ok(Self::WrongCode),
            _ => Err(format!("invalid code stage: {s}")),
        }
    }
}

/// Admin availability.
///
/// Paused admins keep their existing applications but receive no new
/// assignments and no new prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "desk.admin_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AdminStatus {
    #[default]
    Active,
    Paused,
}

impl std::fmt::Display for AdminStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Paused => write!(f, "paused"),
        }
    }
}

impl std::str::FromStr for AdminStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            _ => Err(format!("invalid admin status: {s}")),
        }
    }
}

/// How the admin of an application was chosen. Recorded for audit only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "desk.assignment_mode", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMode {
    /// The applicant arrived through an admin's personal link.
    Specific,
    /// Least-loaded selection.
    #[default]
    Auto,
}

impl std::fmt::Display for AssignmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Specific => write!(f, "specific"),
            Self::Auto => write!(f, "auto"),
        }
    }
}
