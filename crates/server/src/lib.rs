//! verifydesk server library.
//!
//! Two-stage applicant verification: an applicant submits a phone number
//! and PIN, an admin approves the PIN in chat, the applicant submits the
//! code they received, and the admin approves or flags it. The crate is a
//! library so the binary, the CLI, and the integration tests share one
//! router and one state machine.
//!
//! # Layers
//!
//! - [`db`] - record store trait with Postgres and in-memory backends
//! - [`directory`] - admin directory and assignment of new applications
//! - [`workflow`] - the application state machine
//! - [`notify`] - chat transports and the notification dispatcher
//! - [`chat`] - bot commands admins send from Slack or Telegram
//! - [`routes`] - HTTP surface

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod chat;
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod routes;
pub mod state;
pub mod workflow;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// Build the application router with request tracing.
///
/// Sentry layers are added by the binary, outermost.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::routes())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri().path(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
