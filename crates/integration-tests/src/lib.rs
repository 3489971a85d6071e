//! Integration tests for verifydesk.
//!
//! Tests drive the real router in-process with `tower::ServiceExt::oneshot`
//! over a [`MemoryStore`] and a [`RecordingTransport`], so they need no
//! database, network, or chat workspace.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p verifydesk-integration-tests
//!
//! # Postgres-backed store tests (need DATABASE_URL)
//! cargo test -p verifydesk-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `applicant_flow` - applicant API through both stages
//! - `decisions` - ownership, idempotency, and races
//! - `operator` - operator token and directory management
//! - `slack_callbacks` - signed Slack interactions and slash commands
//! - `telegram_webhook` - Telegram updates
//! - `pg_store` - the Postgres backend

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use verifydesk_core::{AdminId, ApplicationId, ChatEndpoint};
use verifydesk_server::config::{
    NotifyConfig, ServerConfig, SlackConfig, TelegramConfig, TransportConfig,
};
use verifydesk_server::db::{MemoryStore, RecordStore};
use verifydesk_server::models::{Admin, Application};
use verifydesk_server::notify::{RecordingTransport, SentMessage};
use verifydesk_server::state::AppState;

pub const OPERATOR_TOKEN: &str = "operator-token-for-tests-0123456789";
pub const SLACK_SIGNING_SECRET: &str = "slack-signing-secret-for-tests";
pub const TELEGRAM_WEBHOOK_SECRET: &str = "telegram-webhook-secret-for-tests";

/// Which inbound chat webhooks the desk accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    None,
    Slack,
    Telegram,
}

/// A desk wired to in-memory collaborators.
pub struct TestDesk {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub transport: Arc<RecordingTransport>,
    router: Router,
}

/// A JSON response.
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl TestDesk {
    #[must_use]
    pub fn new() -> Self {
        Self::with_inbound(Inbound::None)
    }

    #[must_use]
    pub fn with_inbound(inbound: Inbound) -> Self {
        let mut config = ServerConfig::local();
        config.operator_token = Some(SecretString::from(OPERATOR_TOKEN.to_string()));
        config.notify = NotifyConfig {
            max_attempts: 3,
            retry_backoff: Duration::from_millis(1),
            timeout: Duration::from_secs(2),
        };
        config.transport = match inbound {
            Inbound::None => TransportConfig::Log,
            Inbound::Slack => TransportConfig::Slack(SlackConfig {
                bot_token: SecretString::from("xoxb-test".to_string()),
                signing_secret: SecretString::from(SLACK_SIGNING_SECRET.to_string()),
            }),
            Inbound::Telegram => TransportConfig::Telegram(TelegramConfig {
                bot_token: SecretString::from("123:test".to_string()),
                webhook_secret: SecretString::from(TELEGRAM_WEBHOOK_SECRET.to_string()),
            }),
        };

        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(RecordingTransport::new());
        let state = AppState::new(config, store.clone(), transport.clone());
        let router = verifydesk_server::app(state.clone());

        Self {
            state,
            store,
            transport,
            router,
        }
    }

    /// Add an admin and connect it to `endpoint`.
    ///
    /// # Panics
    ///
    /// Panics if the directory rejects the admin.
    pub async fn admin(&self, id: &str, name: &str, endpoint: Option<&str>) -> Admin {
        let directory = self.state.directory();
        let admin = directory
            .add_admin(Some(AdminId::new(id)), name, None)
            .await
            .expect("add admin");
        match endpoint {
            Some(endpoint) => directory
                .connect_endpoint(
                    &admin.admin_id,
                    &ChatEndpoint::parse(endpoint).expect("endpoint"),
                )
                .await
                .expect("connect admin"),
            None => admin,
        }
    }

    /// Send a request and decode the JSON body (`Value::Null` when empty).
    ///
    /// # Panics
    ///
    /// Panics if the router fails or the body is not JSON.
    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        Reply { status, body }
    }

    pub async fn get(&self, path: &str) -> Reply {
        self.send(Request::get(path).body(Body::empty()).expect("request"))
            .await
    }

    pub async fn post(&self, path: &str, json: &Value) -> Reply {
        self.send(json_request("POST", path, json, None)).await
    }

    /// POST with the operator token.
    pub async fn operator_post(&self, path: &str, json: &Value) -> Reply {
        self.send(json_request("POST", path, json, Some(OPERATOR_TOKEN)))
            .await
    }

    /// GET with the operator token.
    pub async fn operator_get(&self, path: &str) -> Reply {
        self.send(
            Request::get(path)
                .header(header::AUTHORIZATION, format!("Bearer {OPERATOR_TOKEN}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
    }

    /// Submit an application and return its id.
    ///
    /// # Panics
    ///
    /// Panics unless the server answers 201.
    pub async fn apply(&self, admin_id: Option<&str>) -> ApplicationId {
        let mut body = serde_json::json!({"phoneNumber": "+255712345678", "pin": "1234"});
        if let Some(admin_id) = admin_id {
            body["adminId"] = Value::from(admin_id);
        }
        let reply = self.post("/api/applications", &body).await;
        assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
        ApplicationId::new(
            reply.body["applicationId"]
                .as_str()
                .expect("applicationId"),
        )
    }

    /// Decide through the operator callback.
    pub async fn decide(
        &self,
        id: &ApplicationId,
        stage: &str,
        decision: &str,
        admin: &str,
    ) -> Reply {
        self.operator_post(
            "/api/decisions",
            &serde_json::json!({
                "applicationId": id,
                "stage": stage,
                "decision": decision,
                "actingAdminId": admin,
            }),
        )
        .await
    }

    pub async fn submit_code(&self, id: &ApplicationId, code: &str) -> Reply {
        self.post(
            &format!("/api/applications/{id}/code"),
            &serde_json::json!({ "code": code }),
        )
        .await
    }

    /// The stored application.
    ///
    /// # Panics
    ///
    /// Panics if the application does not exist.
    pub async fn application(&self, id: &ApplicationId) -> Application {
        self.store
            .get_application(id)
            .await
            .expect("store")
            .expect("application exists")
    }

    /// Current `(pin_stage, code_stage)`, straight from the store.
    pub async fn stages(&self, id: &ApplicationId) -> (String, String) {
        let app = self.application(id).await;
        (app.pin_stage.to_string(), app.code_stage.to_string())
    }

    /// Wait until the transport has recorded at least `count` messages.
    /// Chat callbacks acknowledge decisions from a background task.
    ///
    /// # Panics
    ///
    /// Panics if the messages do not arrive within five seconds.
    pub async fn wait_for_sent(&self, count: usize) -> Vec<SentMessage> {
        for _ in 0..500 {
            let sent = self.transport.sent().await;
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {count} sent messages, got {:?}",
            self.transport.sent().await
        );
    }
}

impl Default for TestDesk {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a JSON request, optionally with a bearer token.
///
/// # Panics
///
/// Panics if the request cannot be built.
#[must_use]
pub fn json_request(
    method: &str,
    path: &str,
    json: &Value,
    bearer: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(json.to_string()))
        .expect("request")
}
