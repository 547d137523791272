//! Transaction ledger API tests.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use sillage_integration_tests::TestApp;

fn dec(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[tokio::test]
async fn test_create_computes_totals_and_starts_pending() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/transactions",
            json!({
                "userId": "u1",
                "email": "buyer@example.com",
                "items": [
                    { "productId": uuid::Uuid::new_v4(), "name": "A", "price": "30", "quantity": 2 },
                    { "productId": uuid::Uuid::new_v4(), "name": "B", "price": "50", "quantity": 1 },
                ],
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    let tx = &body["transaction"];
    assert_eq!(tx["status"], "pending");
    assert!(tx["completedAt"].is_null());
    assert_eq!(dec(&tx["subtotal"]), d("110"));
    assert_eq!(dec(&tx["tax"]), d("8.8"));
    assert_eq!(dec(&tx["shipping"]), Decimal::ZERO);
    assert_eq!(dec(&tx["total"]), d("118.8"));
}

#[tokio::test]
async fn test_create_requires_items() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/transactions",
            json!({ "userId": "u1", "email": "buyer@example.com", "items": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_invalid_status_lists_valid_values() {
    let app = TestApp::new();
    let product = app.create_product("Rose", "40").await;
    let id = app.place_order("u1", &product, "40").await;

    let (status, body) = app
        .patch(&format!("/api/transactions/{id}"), json!({ "status": "shipped" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(
        body["validStatuses"],
        json!(["pending", "completed", "cancelled", "failed"])
    );
}

#[tokio::test]
async fn test_mistyped_status_body_is_validation_error() {
    let app = TestApp::new();
    let product = app.create_product("Rose", "40").await;
    let id = app.place_order("u1", &product, "40").await;

    let (status, body) = app
        .patch(&format!("/api/transactions/{id}"), json!({ "status": 5 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(body["message"].is_string());

    let (status, body) = app.get("/api/transactions?limit=lots").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_status_update_on_missing_transaction_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app
        .patch(
            &format!("/api/transactions/{}", uuid::Uuid::new_v4()),
            json!({ "status": "completed" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_status_change_reports_notification_outcome() {
    let app = TestApp::new();
    let product = app.create_product("Rose", "40").await;
    let id = app.place_order("u1", &product, "40").await;
    let uri = format!("/api/transactions/{id}");

    let (status, body) = app.patch(&uri, json!({ "status": "completed" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transaction"]["status"], "completed");
    assert!(body["transaction"]["completedAt"].is_string());
    assert_eq!(body["notification"]["status"], "not_configured");

    let (_, body) = app.patch(&uri, json!({ "status": "completed" })).await;
    assert_eq!(body["notification"]["status"], "skipped");

    let (_, body) = app.patch(&uri, json!({ "status": "cancelled" })).await;
    assert_eq!(body["transaction"]["status"], "cancelled");
    assert!(body["transaction"]["completedAt"].is_string());
}

#[tokio::test]
async fn test_listing_by_user_email_and_status() {
    let app = TestApp::new();
    let product = app.create_product("Rose", "40").await;
    app.place_order("alice", &product, "40").await;
    app.complete_purchase("alice", &product).await;
    app.place_order("bob", &product, "40").await;

    let (_, body) = app.get("/api/transactions/user/alice").await;
    assert_eq!(body["count"], 2);

    let (_, body) = app.get("/api/transactions/email/bob@example.com").await;
    assert_eq!(body["count"], 1);

    let (_, body) = app.get("/api/transactions?status=completed").await;
    assert_eq!(body["count"], 1);

    let (_, body) = app.get("/api/transactions?limit=2").await;
    assert_eq!(body["count"], 2);

    let (status, _) = app.get("/api/transactions?status=shipped").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_summary_counts_completed_revenue() {
    let app = TestApp::new();
    let product = app.create_product("Rose", "40").await;
    app.complete_purchase("alice", &product).await;
    app.place_order("bob", &product, "40").await;

    let (status, body) = app.get("/api/transactions/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], 1);
    assert_eq!(body["pending"], 1);
    // 50 + 8% tax + 15 shipping
    assert_eq!(dec(&body["revenue"]), d("69"));
}

#[tokio::test]
async fn test_checkout_freezes_prices() {
    let app = TestApp::new();
    let product = app.create_product("Vetiver", "20").await;
    app.post(
        "/api/cart/u1",
        json!({ "productId": product, "quantity": 1 }),
    )
    .await;

    let (status, body) = app
        .post("/api/transactions/checkout/u1", json!({ "email": "u1@example.com" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(dec(&body["transaction"]["total"]), d("36.6"));
    let id = body["transactionId"].as_str().unwrap().to_string();

    let (_, cart) = app.get("/api/cart/u1").await;
    assert!(cart["items"].as_array().unwrap().is_empty());

    let (_, tx) = app.get(&format!("/api/transactions/{id}")).await;
    assert_eq!(dec(&tx["items"][0]["price"]), d("20"));

    let (status, _) = app
        .post("/api/transactions/checkout/u1", json!({ "email": "u1@example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_transaction() {
    let app = TestApp::new();
    let product = app.create_product("Rose", "40").await;
    let id = app.place_order("u1", &product, "40").await;
    let uri = format!("/api/transactions/{id}");

    let (status, _) = app.delete(&uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
