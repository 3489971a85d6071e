//! Integration tests for the operator API.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;

use verifydesk_integration_tests::{OPERATOR_TOKEN, TestDesk, json_request};

fn operator_request(method: &str, path: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {OPERATOR_TOKEN}"))
        .body(Body::empty())
        .expect("request")
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_operator_endpoints_require_token() {
    let desk = TestDesk::new();

    let anonymous = desk.get("/api/operator/admins").await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["error"], "unauthorized");

    let wrong = desk
        .send(json_request(
            "POST",
            "/api/operator/admins",
            &json!({"name": "Mallory"}),
            Some("not-the-token"),
        ))
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let listed = desk.operator_get("/api/operator/admins").await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body["admins"], json!([]));
}

// =============================================================================
// Directory Management
// =============================================================================

#[tokio::test]
async fn test_add_admin_returns_personal_link() {
    let desk = TestDesk::new();

    let reply = desk
        .operator_post(
            "/api/operator/admins",
            &json!({"adminId": "ADM-alice", "name": "Alice", "email": "alice@example.com"}),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["admin"]["admin_id"], "ADM-alice");
    assert_eq!(reply.body["admin"]["status"], "active");
    assert_eq!(reply.body["link"], "http://localhost:3000/?admin=ADM-alice");

    let generated = desk
        .operator_post("/api/operator/admins", &json!({"name": "Bob"}))
        .await;
    assert_eq!(generated.status, StatusCode::CREATED);
    assert!(
        generated.body["admin"]["admin_id"]
            .as_str()
            .is_some_and(|id| !id.is_empty())
    );
}

#[tokio::test]
async fn test_add_admin_rejects_duplicates_and_bad_input() {
    let desk = TestDesk::new();
    desk.admin("ADM-a", "Alice", None).await;

    let duplicate = desk
        .operator_post(
            "/api/operator/admins",
            &json!({"adminId": "ADM-a", "name": "Alice again"}),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.body["error"], "conflict");

    let unnamed = desk
        .operator_post("/api/operator/admins", &json!({"name": "   "}))
        .await;
    assert_eq!(unnamed.status, StatusCode::BAD_REQUEST);

    let bad_id = desk
        .operator_post(
            "/api/operator/admins",
            &json!({"adminId": "has space", "name": "Eve"}),
        )
        .await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pause_and_unpause() {
    let desk = TestDesk::new();
    desk.admin("ADM-a", "Alice", Some("U0A")).await;

    let paused = desk
        .operator_post("/api/operator/admins/ADM-a/pause", &json!({}))
        .await;
    assert_eq!(paused.status, StatusCode::OK);
    assert_eq!(paused.body["admin"]["status"], "paused");

    let rejected = desk
        .post(
            "/api/applications",
            &json!({"phoneNumber": "+255712345678", "pin": "1234"}),
        )
        .await;
    assert_eq!(rejected.status, StatusCode::SERVICE_UNAVAILABLE);

    let unpaused = desk
        .operator_post("/api/operator/admins/ADM-a/unpause", &json!({}))
        .await;
    assert_eq!(unpaused.body["admin"]["status"], "active");
    desk.apply(None).await;

    let missing = desk
        .operator_post("/api/operator/admins/ADM-zzz/pause", &json!({}))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_connect_endpoint() {
    let desk = TestDesk::new();
    desk.admin("ADM-a", "Alice", None).await;
    desk.admin("ADM-b", "Bob", Some("U0B")).await;

    let connected = desk
        .send(json_request(
            "PUT",
            "/api/operator/admins/ADM-a/endpoint",
            &json!({"endpoint": "U0A"}),
            Some(OPERATOR_TOKEN),
        ))
        .await;
    assert_eq!(connected.status, StatusCode::OK);
    assert_eq!(connected.body["admin"]["endpoint"], "U0A");

    let taken = desk
        .send(json_request(
            "PUT",
            "/api/operator/admins/ADM-a/endpoint",
            &json!({"endpoint": "U0B"}),
            Some(OPERATOR_TOKEN),
        ))
        .await;
    assert_eq!(taken.status, StatusCode::CONFLICT);

    let blank = desk
        .send(json_request(
            "PUT",
            "/api/operator/admins/ADM-a/endpoint",
            &json!({"endpoint": "  "}),
            Some(OPERATOR_TOKEN),
        ))
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_removed_admin_keeps_applications_readable() {
    let desk = TestDesk::new();
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    desk.admin("ADM-b", "Bob", Some("U0B")).await;
    let id = desk.apply(Some("ADM-a")).await;

    let removed = desk
        .send(operator_request("DELETE", "/api/operator/admins/ADM-a"))
        .await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.body["success"], true);

    let status = desk.get(&format!("/api/applications/{id}/status")).await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.body["pinStage"], "pending");
    assert_eq!(desk.application(&id).await.admin_id.as_str(), "ADM-a");

    // Nobody else may decide the orphan.
    let reply = desk.decide(&id, "pin", "approve", "ADM-b").await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let again = desk
        .send(operator_request("DELETE", "/api/operator/admins/ADM-a"))
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);

    // New work goes to the remaining admin.
    let next = desk.apply(None).await;
    assert_eq!(desk.application(&next).await.admin_id.as_str(), "ADM-b");
}

// =============================================================================
// Statistics
// =============================================================================

#[tokio::test]
async fn test_stats() {
    let desk = TestDesk::new();
    desk.admin("ADM-a", "Alice", Some("U0A")).await;
    desk.admin("ADM-b", "Bob", Some("U0B")).await;

    let approved = desk.apply(Some("ADM-a")).await;
    desk.decide(&approved, "pin", "approve", "ADM-a").await;
    desk.submit_code(&approved, "4821").await;
    desk.decide(&approved, "code", "approve", "ADM-a").await;

    let denied = desk.apply(Some("ADM-a")).await;
    desk.decide(&denied, "pin", "deny", "ADM-a").await;

    desk.apply(Some("ADM-b")).await;

    let system = desk.operator_get("/api/operator/stats").await;
    assert_eq!(system.status, StatusCode::OK);
    let stats = &system.body["stats"];
    assert_eq!(stats["total_admins"], 2);
    assert_eq!(stats["total_applications"], 3);
    assert_eq!(stats["pin_pending"], 1);
    assert_eq!(stats["fully_approved"], 1);
    assert_eq!(stats["total_rejected"], 1);

    let alice = desk.operator_get("/api/operator/stats?admin=ADM-a").await;
    assert_eq!(alice.body["stats"]["admin_id"], "ADM-a");
    assert_eq!(alice.body["stats"]["stats"]["total"], 2);
    assert_eq!(alice.body["stats"]["stats"]["pin_approved"], 1);
    assert_eq!(alice.body["stats"]["stats"]["fully_approved"], 1);

    let unknown = desk.operator_get("/api/operator/stats?admin=ADM-zzz").await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let listed = desk.operator_get("/api/operator/admins").await;
    let rows = listed.body["admins"].as_array().expect("admins");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["admin_id"], "ADM-a");
    assert_eq!(rows[0]["stats"]["total"], 2);
    assert_eq!(rows[1]["stats"]["pin_pending"], 1);
}
