//! Integration tests for the Telegram webhook.
//!
//! Replies come back in the webhook response body as Bot API calls, so the
//! tests read them straight off the response.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};

use verifydesk_core::{AdminId, Decision, PinDecision};
use verifydesk_integration_tests::{Inbound, TELEGRAM_WEBHOOK_SECRET, TestDesk};
use verifydesk_server::notify::SentMessage;

fn update(update: &Value, secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/api/telegram/webhook")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(secret) = secret {
        builder = builder.header("X-Telegram-Bot-Api-Secret-Token", secret);
    }
    builder
        .body(Body::from(update.to_string()))
        .expect("request")
}

fn callback(from: i64, data: &str) -> Value {
    json!({
        "update_id": 1,
        "callback_query": {
            "id": "cb-1",
            "from": {"id": from, "is_bot": false, "first_name": "Ann"},
            "message": {"message_id": 9, "chat": {"id": from, "type": "private"}, "text": "prompt"},
            "data": data
        }
    })
}

fn message(chat: i64, text: &str) -> Value {
    json!({
        "update_id": 2,
        "message": {
            "message_id": 10,
            "chat": {"id": chat, "type": "private"},
            "from": {"id": chat, "is_bot": false, "first_name": "Ann"},
            "text": text
        }
    })
}

// =============================================================================
// Secret Header
// =============================================================================

#[tokio::test]
async fn test_webhook_secret_is_required() {
    let desk = TestDesk::with_inbound(Inbound::Telegram);

    let missing = desk.send(update(&message(42, "/help"), None)).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let wrong = desk
        .send(update(&message(42, "/help"), Some("wrong-secret")))
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let right = desk
        .send(update(&message(42, "/help"), Some(TELEGRAM_WEBHOOK_SECRET)))
        .await;
    assert_eq!(right.status, StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_absent_without_telegram() {
    let desk = TestDesk::new();
    let reply = desk
        .send(update(&message(42, "/help"), Some(TELEGRAM_WEBHOOK_SECRET)))
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Callback Queries
// =============================================================================

#[tokio::test]
async fn test_button_press_decides_and_answers() {
    let desk = TestDesk::with_inbound(Inbound::Telegram);
    desk.admin("ADM-a", "Alice", Some("42")).await;
    let id = desk.apply(None).await;

    let data = Decision::Pin(PinDecision::Approve).key(&id);
    let reply = desk
        .send(update(&callback(42, &data), Some(TELEGRAM_WEBHOOK_SECRET)))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.body,
        json!({
            "method": "answerCallbackQuery",
            "callback_query_id": "cb-1",
            "text": "Recorded: Approve",
            "show_alert": false
        })
    );
    assert_eq!(desk.stages(&id).await.0, "approved");

    // Pressing again is refused with an alert.
    let again = desk
        .send(update(&callback(42, &data), Some(TELEGRAM_WEBHOOK_SECRET)))
        .await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.body["show_alert"], true);
    assert_eq!(again.body["text"], "This stage has already been decided.");
}

#[tokio::test]
async fn test_button_press_is_answered_before_slow_delivery() {
    let desk = TestDesk::with_inbound(Inbound::Telegram);
    desk.admin("ADM-a", "Alice", Some("42")).await;
    let id = desk.apply(None).await;
    let sent_before = desk.transport.sent().await.len();
    desk.transport
        .set_delay(Some(Duration::from_millis(1500)))
        .await;

    let data = Decision::Pin(PinDecision::Deny).key(&id);
    let reply = tokio::time::timeout(
        Duration::from_millis(500),
        desk.send(update(&callback(42, &data), Some(TELEGRAM_WEBHOOK_SECRET))),
    )
    .await
    .expect("callback answered without waiting for delivery");
    assert_eq!(reply.body["text"], "Recorded: Deny");
    assert_eq!(desk.stages(&id).await.0, "rejected");

    let sent = desk.wait_for_sent(sent_before + 1).await;
    assert!(matches!(sent.last(), Some(SentMessage::Replaced { .. })));
}

#[tokio::test]
async fn test_button_press_from_another_admin_is_refused() {
    let desk = TestDesk::with_inbound(Inbound::Telegram);
    desk.admin("ADM-a", "Alice", Some("42")).await;
    desk.admin("ADM-b", "Bob", Some("43")).await;
    let id = desk.apply(Some("ADM-a")).await;

    let data = Decision::Pin(PinDecision::Deny).key(&id);
    let reply = desk
        .send(update(&callback(43, &data), Some(TELEGRAM_WEBHOOK_SECRET)))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["show_alert"], true);
    assert!(
        reply.body["text"]
            .as_str()
            .is_some_and(|t| t.starts_with("Not allowed"))
    );
    assert_eq!(desk.stages(&id).await.0, "pending");
}

#[tokio::test]
async fn test_button_press_from_unconnected_chat() {
    let desk = TestDesk::with_inbound(Inbound::Telegram);
    desk.admin("ADM-a", "Alice", Some("42")).await;
    let id = desk.apply(None).await;

    let data = Decision::Pin(PinDecision::Approve).key(&id);
    let reply = desk
        .send(update(&callback(99, &data), Some(TELEGRAM_WEBHOOK_SECRET)))
        .await;
    assert_eq!(reply.body["show_alert"], true);
    assert_eq!(desk.stages(&id).await.0, "pending");
}

#[tokio::test]
async fn test_malformed_callback_data() {
    let desk = TestDesk::with_inbound(Inbound::Telegram);
    desk.admin("ADM-a", "Alice", Some("42")).await;

    let reply = desk
        .send(update(&callback(42, "pin:maybe:APP-1"), Some(TELEGRAM_WEBHOOK_SECRET)))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["text"], "Unknown action.");
}

// =============================================================================
// Messages
// =============================================================================

#[tokio::test]
async fn test_start_message_connects_chat() {
    let desk = TestDesk::with_inbound(Inbound::Telegram);
    desk.admin("ADM-a", "Alice", None).await;

    let reply = desk
        .send(update(&message(4242, "/start ADM-a"), Some(TELEGRAM_WEBHOOK_SECRET)))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["method"], "sendMessage");
    assert_eq!(reply.body["chat_id"], "4242");
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
    assert_eq!(admin.endpoint.map(|e| e.to_string()).as_deref(), Some("4242"));
}

#[tokio::test]
async fn test_start_cannot_take_over_a_connected_admin() {
    let desk = TestDesk::with_inbound(Inbound::Telegram);
    desk.admin("ADM-a", "Alice", Some("42")).await;
    let id = desk.apply(Some("ADM-a")).await;

    let listed = desk.get("/api/admins").await;
    assert_eq!(listed.body["admins"][0]["id"], "ADM-a");

    let reply = desk
        .send(update(&message(999, "/start ADM-a"), Some(TELEGRAM_WEBHOOK_SECRET)))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(
        reply.body["text"]
            .as_str()
            .is_some_and(|t| t.starts_with("Admin ADM-a is already connected"))
    );

    // The stranger's button press is not attributed to Alice.
    let data = Decision::Pin(PinDecision::Approve).key(&id);
    let press = desk
        .send(update(&callback(999, &data), Some(TELEGRAM_WEBHOOK_SECRET)))
        .await;
    assert_eq!(press.body["show_alert"], true);
    assert_eq!(desk.stages(&id).await.0, "pending");

    let admin = desk
        .state
        .directory()
        .get_admin(&AdminId::new("ADM-a"))
        .await
        .unwrap();
    assert_eq!(admin.endpoint.map(|e| e.to_string()).as_deref(), Some("42"));
}

#[tokio::test]
async fn test_plain_text_is_ignored() {
    let desk = TestDesk::with_inbound(Inbound::Telegram);

    let reply = desk
        .send(update(&message(42, "hello there"), Some(TELEGRAM_WEBHOOK_SECRET)))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, Value::Null);
}

#[tokio::test]
async fn test_other_updates_are_acknowledged() {
    let desk = TestDesk::with_inbound(Inbound::Telegram);

    let reply = desk
        .send(update(&json!({"update_id": 3}), Some(TELEGRAM_WEBHOOK_SECRET)))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, Value::Null);
}
