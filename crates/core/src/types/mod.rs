//! Core types for verifydesk.
//!
//! This module provides type-safe wrappers for the workflow's domain concepts.

pub mod decision;
pub mod endpoint;
pub mod id;
pub mod status;

pub use decision::{CodeDecision, Decision, DecisionParseError, PinDecision, Stage};
pub use endpoint::{ChatEndpoint, EndpointError};
pub use id::*;
pub use status::*;
