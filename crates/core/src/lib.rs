//! verifydesk core - shared types library.
//!
//! This crate provides the types used across all verifydesk components:
//! - `server` - Applicant API, admin chat callbacks, and the approval workflow
//! - `cli` - Command-line tools for migrations, the admin directory, and
//!   simulating an applicant
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients. The two-stage transition rules live here so that
//! every store backend and every transport agrees on them.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, chat endpoints, stages, and decisions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
