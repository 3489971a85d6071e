//! Integration tests for Slack interactions and slash commands.
//!
//! Requests are signed with the test signing secret exactly as Slack signs
//! them, so the real verification path runs.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;
use url::form_urlencoded;

use verifydesk_core::AdminId;
use verifydesk_integration_tests::{Inbound, SLACK_SIGNING_SECRET, TestDesk};
use verifydesk_server::notify::SentMessage;
use verifydesk_server::notify::slack::sign;

fn signed(path: &str, body: String, secret: &str) -> Request<Body> {
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature = sign(secret, &timestamp, &body).expect("sign");
    Request::post(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("X-Slack-Request-Timestamp", timestamp)
        .header("X-Slack-Signature", signature)
        .body(Body::from(body))
        .expect("request")
}

/// A `block_actions` payload for one button click.
fn click(user_id: &str, action_id: &str, application_id: &str) -> String {
    let payload = json!({
        "type": "block_actions",
        "user": {"id": user_id, "username": "someone"},
        "actions": [{"action_id": action_id, "value": application_id}],
    });
    form_urlencoded::Serializer::new(String::new())
        .append_pair("payload", &payload.to_string())
        .finish()
}

fn slash(user_id: &str, command: &str, text: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("command", command)
        .append_pair("text", text)
        .append_pair("user_id", user_id)
        .append_pair("channel_id", "D0123")
        .finish()
}

// =============================================================================
// Signature Verification
// =============================================================================

#[tokio::test]
async fn test_unsigned_and_badly_signed_requests_are_rejected() {
    let desk = TestDesk::with_inbound(Inbound::Slack);
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    let id = desk.apply(None).await;
    let body = click("U0A", "pin_approve", id.as_str());

    let unsigned = desk
        .send(
            Request::post("/api/slack/interactions")
                .body(Body::from(body.clone()))
                .expect("request"),
        )
        .await;
    assert_eq!(unsigned.status, StatusCode::BAD_REQUEST);

    let forged = desk
        .send(signed("/api/slack/interactions", body, "some-other-secret"))
        .await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);

    assert_eq!(desk.stages(&id).await.0, "pending");
}

#[tokio::test]
async fn test_slack_routes_absent_without_slack() {
    let desk = TestDesk::new();
    let reply = desk
        .send(signed(
            "/api/slack/commands",
            slash("U0A", "/help", ""),
            SLACK_SIGNING_SECRET,
        ))
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Decision Buttons
// =============================================================================

#[tokio::test]
async fn test_button_click_decides_and_replaces_prompt() {
    let desk = TestDesk::with_inbound(Inbound::Slack);
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    let id = desk.apply(None).await;

    let prompts = desk.transport.prompts().await;
    let action = prompts[0].actions[0];
    assert_eq!(action.action_name(), "pin_approve");
    let sent_before = desk.transport.sent().await.len();

    let reply = desk
        .send(signed(
            "/api/slack/interactions",
            click("U0A", &action.action_name(), id.as_str()),
            SLACK_SIGNING_SECRET,
        ))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(desk.stages(&id).await.0, "approved");

    match desk.wait_for_sent(sent_before + 1).await.last() {
        Some(SentMessage::Replaced { text, .. }) => assert!(text.contains("approved"), "{text}"),
        other => panic!("expected the prompt to be replaced, got {other:?}"),
    }
}

#[tokio::test]
async fn test_click_is_acknowledged_before_slow_delivery() {
    let desk = TestDesk::with_inbound(Inbound::Slack);
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    let id = desk.apply(None).await;
    let sent_before = desk.transport.sent().await.len();
    desk.transport
        .set_delay(Some(Duration::from_millis(1500)))
        .await;

    let reply = tokio::time::timeout(
        Duration::from_millis(500),
        desk.send(signed(
            "/api/slack/interactions",
            click("U0A", "pin_approve", id.as_str()),
            SLACK_SIGNING_SECRET,
        )),
    )
    .await
    .expect("interaction answered without waiting for delivery");
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(desk.stages(&id).await.0, "approved");

    // The acknowledgement still arrives once the transport catches up.
    let sent = desk.wait_for_sent(sent_before + 1).await;
    assert!(matches!(sent.last(), Some(SentMessage::Replaced { .. })));
}

#[tokio::test]
async fn test_click_from_non_owner_changes_nothing() {
    let desk = TestDesk::with_inbound(Inbound::Slack);
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    desk.admin("ADM-b", "Bob", Some("U0B")).await;
    let id = desk.apply(Some("ADM-a")).await;
    let sent_before = desk.transport.sent().await.len();

    let reply = desk
        .send(signed(
            "/api/slack/interactions",
            click("U0B", "pin_deny", id.as_str()),
            SLACK_SIGNING_SECRET,
        ))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(desk.stages(&id).await.0, "pending");
    assert_eq!(desk.transport.sent().await.len(), sent_before);
}

#[tokio::test]
async fn test_click_from_unknown_user_changes_nothing() {
    let desk = TestDesk::with_inbound(Inbound::Slack);
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    let id = desk.apply(None).await;

    let reply = desk
        .send(signed(
            "/api/slack/interactions",
            click("U0STRANGER", "pin_approve", id.as_str()),
            SLACK_SIGNING_SECRET,
        ))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(desk.stages(&id).await.0, "pending");
}

#[tokio::test]
async fn test_unknown_action_is_bad_request() {
    let desk = TestDesk::with_inbound(Inbound::Slack);
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    let id = desk.apply(None).await;

    let reply = desk
        .send(signed(
            "/api/slack/interactions",
            click("U0A", "pin_maybe", id.as_str()),
            SLACK_SIGNING_SECRET,
        ))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_code_buttons_after_submission() {
    let desk = TestDesk::with_inbound(Inbound::Slack);
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    let id = desk.apply(None).await;
    desk.decide(&id, "pin", "approve", "ADM-a").await;
    desk.submit_code(&id, "4821").await;

    let prompt = desk.transport.prompts().await.pop().expect("code prompt");
    let names: Vec<String> = prompt.actions.iter().map(|d| d.action_name()).collect();
    assert_eq!(names, ["code_approve", "code_wrong_pin", "code_wrong_code"]);

    let reply = desk
        .send(signed(
            "/api/slack/interactions",
            click("U0A", "code_wrong_code", id.as_str()),
            SLACK_SIGNING_SECRET,
        ))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(desk.stages(&id).await.1, "wrong_code");
}

// =============================================================================
// Slash Commands
// =============================================================================

#[tokio::test]
async fn test_start_command_connects_chat() {
    let desk = TestDesk::with_inbound(Inbound::Slack);
    desk.admin("ADM-a", "Alice", None).await;

    let reply = desk
        .send(signed(
            "/api/slack/commands",
            slash("U0NEW", "/start", "ADM-a"),
            SLACK_SIGNING_SECRET,
        ))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["response_type"], "ephemeral");
    assert!(
        reply.body["text"]
            .as_str()
            .is_some_and(|t| t.starts_with("Welcome Alice"))
    );

    let admin = desk
        .state
        .directory()
        .get_admin(&AdminId::new("ADM-a"))
        .await
        .unwrap();
    assert_eq!(admin.endpoint.map(|e| e.to_string()).as_deref(), Some("U0NEW"));

    // The new connection makes Alice eligible for auto-assignment.
    desk.apply(None).await;
}

#[tokio::test]
async fn test_commands_from_unconnected_chat() {
    let desk = TestDesk::with_inbound(Inbound::Slack);

    let reply = desk
        .send(signed(
            "/api/slack/commands",
            slash("U0NOBODY", "/stats", ""),
            SLACK_SIGNING_SECRET,
        ))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(
        reply.body["text"]
            .as_str()
            .is_some_and(|t| t.starts_with("This chat is not connected"))
    );
}

#[tokio::test]
async fn test_pending_command_lists_waiting_applications() {
    let desk = TestDesk::with_inbound(Inbound::Slack);
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    let id = desk.apply(None).await;

    let reply = desk
        .send(signed(
            "/api/slack/commands",
            slash("U0A", "/pending", ""),
            SLACK_SIGNING_SECRET,
        ))
        .await;
    let text = reply.body["text"].as_str().expect("text");
    assert!(text.contains("Awaiting PIN decision (1)"), "{text}");
    assert!(text.contains(id.as_str()), "{text}");
}
