//! Admin decisions and their wire keys.
//!
//! Chat transports encode a decision into a button payload and decode it
//! again when the admin taps. The key format is `<stage>:<decision>:<id>`,
//! for example `pin:approve:APP-0190...` or `code:wrong_code:APP-0190...`.
//! Labels shown to the admin always match the decision they trigger.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::ApplicationId;
use super::status::{CodeStage, PinStage};

/// Which of the two tracks a decision targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pin,
    Code,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pin => "pin",
            Self::Code => "code",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = DecisionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pin" => Ok(Self::Pin),
            "code" => Ok(Self::Code),
            other => Err(DecisionParseError::UnknownStage(other.to_owned())),
        }
    }
}

/// Decision on the pin stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinDecision {
    Approve,
    Deny,
}

impl PinDecision {
    /// The stage this decision moves a pending pin track to.
    #[must_use]
    pub const fn target(self) -> PinStage {
        match self {
            Self::Approve => PinStage::Approved,
            Self::Deny => PinStage::Rejected,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Deny => "deny",
        }
    }

    /// Button label shown to the admin.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approve => "Approve",
            Self::Deny => "Deny",
        }
    }
}

impl fmt::Display for PinDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PinDecision {
    type Err = DecisionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "deny" => Ok(Self::Deny),
            other => Err(DecisionParseError::UnknownDecision(other.to_owned())),
        }
    }
}

/// Decision on the code stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeDecision {
    Approve,
    WrongPin,
    WrongCode,
}

impl CodeDecision {
    /// The stage this decision moves a pending code track to.
    #[must_use]
    pub const fn target(self) -> CodeStage {
        match self {
            Self::Approve => CodeStage::Approved,
            Self::WrongPin => CodeStage::WrongPin,
            Self::WrongCode => CodeStage::WrongCode,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::WrongPin => "wrong_pin",
            Self::WrongCode => "wrong_code",
        }
    }

    /// Button label shown to the admin.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approve => "Approve",
            Self::WrongPin => "Wrong PIN",
            Self::WrongCode => "Wrong code",
        }
    }
}

impl fmt::Display for CodeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CodeDecision {
    type Err = DecisionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "wrong_pin" => Ok(Self::WrongPin),
            "wrong_code" => Ok(Self::WrongCode),
            other => Err(DecisionParseError::UnknownDecision(other.to_owned())),
        }
    }
}

/// Error parsing a decision from a string or wire key.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecisionParseError {
    #[error("unknown stage: {0}")]
    UnknownStage(String),
    #[error("unknown decision: {0}")]
    UnknownDecision(String),
    #[error("malformed decision key: {0}")]
    Malformed(String),
}

/// A decision on either stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Pin(PinDecision),
    Code(CodeDecision),
}

impl Decision {
    /// Every decision, pin stage first, in the order buttons are rendered.
    pub const ALL: [Self; 5] = [
        Self::Pin(PinDecision::Approve),
        Self::Pin(PinDecision::Deny),
        Self::Code(CodeDecision::Approve),
        Self::Code(CodeDecision::WrongPin),
        Self::Code(CodeDecision::WrongCode),
    ];

    #[must_use]
    pub const fn stage(self) -> Stage {
        match self {
            Self::Pin(_) => Stage::Pin,
            Self::Code(_) => Stage::Code,
        }
    }

    /// Decision name without the stage (`approve`, `wrong_code`, ...).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pin(d) => d.as_str(),
            Self::Code(d) => d.as_str(),
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pin(d) => d.label(),
            Self::Code(d) => d.label(),
        }
    }

    /// Build a decision from its stage and decision name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a decision of that stage.
    pub fn from_parts(stage: Stage, name: &str) -> Result<Self, DecisionParseError> {
        match stage {
            Stage::Pin => name.parse().map(Self::Pin),
            Stage::Code => name.parse().map(Self::Code),
        }
    }

    /// Action name without the application id, e.g. `code_wrong_pin`.
    ///
    /// Used where the transport carries the id separately (Slack buttons
    /// carry it in `value`).
    #[must_use]
    pub fn action_name(self) -> String {
        format!("{}_{}", self.stage(), self.name())
    }

    /// Parse an action name produced by [`Decision::action_name`].
    ///
    /// # Errors
    ///
    /// Returns an error for unknown stage prefixes or decision names.
    pub fn parse_action_name(s: &str) -> Result<Self, DecisionParseError> {
        let (stage, name) = s
            .split_once('_')
            .ok_or_else(|| DecisionParseError::Malformed(s.to_owned()))?;
        Self::from_parts(stage.parse()?, name)
    }

    /// Full key including the application id: `<stage>:<decision>:<id>`.
    #[must_use]
    pub fn key(self, application_id: &ApplicationId) -> String {
        format!("{}:{}:{}", self.stage(), self.name(), application_id)
    }

    /// Parse a key produced by [`Decision::key`].
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not have three parts, the id is
    /// empty, or the stage/decision is unknown.
    pub fn parse_key(s: &str) -> Result<(Self, ApplicationId), DecisionParseError> {
        let mut parts = s.splitn(3, ':');
        let (Some(stage), Some(name), Some(id)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(DecisionParseError::Malformed(s.to_owned()));
        };
        if id.is_empty() {
            return Err(DecisionParseError::Malformed(s.to_owned()));
        }
        let decision = Self::from_parts(stage.parse()?, name)?;
        Ok((decision, ApplicationId::new(id)))
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.stage(), self.name())
    }
}
