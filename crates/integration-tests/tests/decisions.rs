//! Integration tests for admin decisions.
//!
//! Ownership, stage ordering, and idempotency of the decision callback,
//! including concurrent duplicate clicks.

use axum::http::StatusCode;
use serde_json::json;

use verifydesk_core::{AdminId, ApplicationId, CodeDecision, Decision, PinDecision};
use verifydesk_integration_tests::{TestDesk, json_request};
use verifydesk_server::notify::SentMessage;
use verifydesk_server::workflow::{Outcome, Workflow, WorkflowError};

// =============================================================================
// Ownership
// =============================================================================

#[tokio::test]
async fn test_only_the_owner_may_decide() {
    let desk = TestDesk::new();
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    desk.admin("ADM-b", "Bob", Some("U0B")).await;
    let id = desk.apply(Some("ADM-a")).await;

    for decision in ["approve", "deny"] {
        let reply = desk.decide(&id, "pin", decision, "ADM-b").await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN, "{decision}");
        assert_eq!(reply.body["error"], "forbidden");
    }

    desk.decide(&id, "pin", "approve", "ADM-a").await;
    desk.submit_code(&id, "4821").await;

    for decision in ["approve", "wrong_pin", "wrong_code"] {
        let reply = desk.decide(&id, "code", decision, "ADM-b").await;
        assert_eq!(reply.status, StatusCode::FORBIDDEN, "{decision}");
    }
    assert_eq!(desk.stages(&id).await, ("approved".into(), "pending".into()));
}

#[tokio::test]
async fn test_unknown_application() {
    let desk = TestDesk::new();
    desk.admin("ADM-a", "Alice", Some("U0A")).await;

    let reply = desk
        .decide(&ApplicationId::new("APP-missing"), "pin", "approve", "ADM-a")
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["error"], "not_found");
}

// =============================================================================
// Stage Ordering
// =============================================================================

#[tokio::test]
async fn test_code_decision_requires_approved_pin_and_code() {
    let desk = TestDesk::new();
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    let id = desk.apply(None).await;

    let early = desk.decide(&id, "code", "approve", "ADM-a").await;
    assert_eq!(early.status, StatusCode::FORBIDDEN);

    desk.decide(&id, "pin", "approve", "ADM-a").await;
    let no_code = desk.decide(&id, "code", "approve", "ADM-a").await;
    assert_eq!(no_code.status, StatusCode::FORBIDDEN);
    assert_eq!(desk.stages(&id).await, ("approved".into(), "pending".into()));
}

#[tokio::test]
async fn test_code_before_pin_approval_is_forbidden() {
    let desk = TestDesk::new();
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    let id = desk.apply(None).await;

    let reply = desk.submit_code(&id, "4821").await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    let app = desk.application(&id).await;
    assert!(app.code.is_none());
}

#[tokio::test]
async fn test_invalid_decision_for_stage() {
    let desk = TestDesk::new();
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    let id = desk.apply(None).await;

    let reply = desk.decide(&id, "pin", "wrong_code", "ADM-a").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(desk.stages(&id).await, ("pending".into(), "pending".into()));
}

// =============================================================================
// Idempotency
// =============================================================================

#[tokio::test]
async fn test_repeat_decision_sends_nothing() {
    let desk = TestDesk::new();
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    let id = desk.apply(None).await;

    desk.decide(&id, "pin", "approve", "ADM-a").await;
    let sent = desk.transport.sent().await;
    assert_eq!(sent.len(), 2);
    assert!(matches!(sent[1], SentMessage::Replaced { .. }));

    for decision in ["approve", "deny"] {
        let reply = desk.decide(&id, "pin", decision, "ADM-a").await;
        assert_eq!(reply.status, StatusCode::CONFLICT, "{decision}");
        assert_eq!(reply.body["error"], "already_decided");
    }
    assert_eq!(desk.transport.sent().await.len(), 2);
    assert_eq!(desk.stages(&id).await.0, "approved");
}

#[tokio::test]
async fn test_concurrent_duplicate_decisions() {
    let desk = TestDesk::new();
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    let id = desk.apply(None).await;
    let admin = AdminId::new("ADM-a");
    let workflow = desk.state.workflow();

    let approve = Decision::Pin(PinDecision::Approve);
    let deny = Decision::Pin(PinDecision::Deny);
    let (first, second) = tokio::join!(
        workflow.decide(&id, approve, &admin),
        workflow.decide(&id, deny, &admin),
    );

    let winners = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    let loser = if first.is_ok() { second } else { first };
    assert!(matches!(loser, Err(WorkflowError::AlreadyDecided(_))));

    // Exactly one outcome replaced the prompt.
    let replaced = desk
        .transport
        .sent()
        .await
        .iter()
        .filter(|m| matches!(m, SentMessage::Replaced { .. }))
        .count();
    assert_eq!(replaced, 1);
}

#[tokio::test]
async fn test_concurrent_code_decisions() {
    let desk = TestDesk::new();
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    let id = desk.apply(None).await;
    desk.decide(&id, "pin", "approve", "ADM-a").await;
    desk.submit_code(&id, "4821").await;

    let admin = AdminId::new("ADM-a");
    let results = decide_every_way(desk.state.workflow(), &id, &admin).await;
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(desk.transport.prompts().await.len(), 2);
}

/// Press all three code buttons at once.
async fn decide_every_way(
    workflow: &Workflow,
    id: &ApplicationId,
    admin: &AdminId,
) -> Vec<Result<Outcome, WorkflowError>> {
    let (a, b, c) = tokio::join!(
        workflow.decide(id, Decision::Code(CodeDecision::Approve), admin),
        workflow.decide(id, Decision::Code(CodeDecision::WrongCode), admin),
        workflow.decide(id, Decision::Code(CodeDecision::WrongPin), admin),
    );
    vec![a, b, c]
}

// =============================================================================
// Paused and Removed Owners
// =============================================================================

#[tokio::test]
async fn test_paused_admin_still_decides_but_gets_no_new_prompts() {
    let desk = TestDesk::new();
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    let id = desk.apply(None).await;
    desk.state
        .directory()
        .pause_admin(&AdminId::new("ADM-a"))
        .await
        .unwrap();

    let reply = desk.decide(&id, "pin", "approve", "ADM-a").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["delivery"]["outcome"], "delivered");

    desk.submit_code(&id, "4821").await;
    assert_eq!(desk.transport.prompts().await.len(), 1);

    let reply = desk.decide(&id, "code", "approve", "ADM-a").await;
    assert_eq!(reply.body["codeStage"], "approved");
}

#[tokio::test]
async fn test_unconnected_owner_is_unreachable() {
    let desk = TestDesk::new();
    desk.admin("ADM-a", "Alice", None).await;
    let id = desk.apply(Some("ADM-a")).await;

    let reply = desk.decide(&id, "pin", "approve", "ADM-a").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["delivery"], json!({"outcome": "unreachable"}));
    assert!(desk.transport.sent().await.is_empty());
}

// =============================================================================
// Operator Token
// =============================================================================

#[tokio::test]
async fn test_decision_callback_requires_operator_token() {
    let desk = TestDesk::new();
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    let id = desk.apply(None).await;
    let body = json!({
        "applicationId": id,
        "stage": "pin",
        "decision": "approve",
        "actingAdminId": "ADM-a",
    });

    let anonymous = desk
        .send(json_request("POST", "/api/decisions", &body, None))
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let wrong = desk
        .send(json_request("POST", "/api/decisions", &body, Some("nope")))
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(desk.stages(&id).await.0, "pending");
}
