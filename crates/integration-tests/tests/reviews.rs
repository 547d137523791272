//! Review API tests: purchase gating, ownership and rating aggregation.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use sillage_integration_tests::TestApp;

fn dec(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

fn review(product_id: &str, user: &str, rating: i64, comment: &str) -> Value {
    json!({
        "productId": product_id,
        "userId": user,
        "name": "Camille",
        "rating": rating,
        "title": "Lovely",
        "comment": comment,
    })
}

#[tokio::test]
async fn test_review_requires_completed_purchase() {
    let app = TestApp::new();
    let product = app.create_product("Vetiver Noir", "89").await;

    let (status, body) = app.post("/api/reviews", review(&product, "u1", 5, "Great")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "permission_denied");

    // A pending order is not enough.
    app.place_order("u1", &product, "89").await;
    let (status, _) = app.post("/api/reviews", review(&product, "u1", 5, "Great")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.complete_purchase("u1", &product).await;
    let (status, body) = app.post("/api/reviews", review(&product, "u1", 5, "Great")).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["review"]["verifiedPurchase"], true);
}

#[tokio::test]
async fn test_missing_fields_fail_validation_before_eligibility() {
    let app = TestApp::new();
    let product = app.create_product("Iris", "70").await;

    let (status, body) = app
        .post("/api/reviews", json!({ "productId": product, "userId": "u1" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = app.post("/api/reviews", review(&product, "u1", 9, "Hmm")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_second_review_conflicts() {
    let app = TestApp::new();
    let product = app.create_product("Oud", "120").await;
    app.complete_purchase("u1", &product).await;

    let (status, _) = app.post("/api/reviews", review(&product, "u1", 4, "Rich")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.post("/api/reviews", review(&product, "u1", 2, "Again")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_rating_aggregates_on_every_write() {
    let app = TestApp::new();
    let product = app.create_product("Ambre", "95").await;
    app.complete_purchase("a", &product).await;
    app.complete_purchase("b", &product).await;

    app.post("/api/reviews", review(&product, "a", 5, "Warm")).await;
    let (_, created) = app.post("/api/reviews", review(&product, "b", 4, "Nice")).await;
    let review_id = created["review"]["id"].as_str().unwrap().to_string();

    let (_, body) = app.get(&format!("/api/products/{product}")).await;
    assert_eq!(dec(&body["averageRating"]), "4.5".parse::<Decimal>().unwrap());
    assert_eq!(body["reviewCount"], 2);

    let (status, _) = app
        .put(
            &format!("/api/reviews/{review_id}"),
            json!({ "userId": "b", "rating": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get(&format!("/api/products/{product}")).await;
    assert_eq!(dec(&body["averageRating"]), "3.5".parse::<Decimal>().unwrap());

    let (_, stats) = app.get(&format!("/api/reviews/product/{product}/stats")).await;
    assert_eq!(stats["totalReviews"], 2);
    assert_eq!(stats["ratingDistribution"]["5"], 1);
    assert_eq!(stats["ratingDistribution"]["2"], 1);
    assert_eq!(stats["ratingDistribution"]["3"], 0);
}

#[tokio::test]
async fn test_deleting_last_review_resets_rating() {
    let app = TestApp::new();
    let product = app.create_product("Neroli", "60").await;
    app.complete_purchase("u1", &product).await;

    let (_, created) = app.post("/api/reviews", review(&product, "u1", 3, "Fine")).await;
    let review_id = created["review"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .delete(
            &format!("/api/reviews/{review_id}"),
            Some(json!({ "userId": "u1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get(&format!("/api/products/{product}")).await;
    assert_eq!(dec(&body["averageRating"]), Decimal::ZERO);
    assert_eq!(body["reviewCount"], 0);
}

#[tokio::test]
async fn test_only_owner_edits_and_admin_may_delete() {
    let app = TestApp::new();
    let product = app.create_product("Cuir", "80").await;
    app.complete_purchase("owner", &product).await;

    let (_, created) = app.post("/api/reviews", review(&product, "owner", 4, "Soft")).await;
    let review_id = created["review"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/reviews/{review_id}");

    let (status, _) = app.put(&uri, json!({ "userId": "intruder", "rating": 1 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, Some(json!({ "userId": "intruder" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .delete(&uri, Some(json!({ "userId": "moderator", "isAdmin": true })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.delete(&uri, Some(json!({ "userId": "owner" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profanity_is_masked_and_flagged() {
    let app = TestApp::new();
    let product = app.create_product("Musc", "40").await;
    app.complete_purchase("u1", &product).await;

    let (status, body) = app
        .post("/api/reviews", review(&product, "u1", 1, "Smells like crap"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["textFiltered"], true);
    assert_eq!(body["review"]["comment"], "Smells like ****");
}

#[tokio::test]
async fn test_unfiltered_deployment_stores_text_as_submitted() {
    let app = TestApp::without_filter();
    let product = app.create_product("Musc", "40").await;
    app.complete_purchase("u1", &product).await;

    let (status, body) = app
        .post("/api/reviews", review(&product, "u1", 1, "Smells like crap"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["textFiltered"], false);
    assert_eq!(body["review"]["comment"], "Smells like crap");
}

#[tokio::test]
async fn test_check_reports_eligibility() {
    let app = TestApp::new();
    let product = app.create_product("Figuier", "58").await;
    let uri = format!("/api/reviews/product/{product}/user/u1/check");

    let (_, body) = app.get(&uri).await;
    assert_eq!(body["hasCompletedPurchase"], false);
    assert_eq!(body["canReview"], false);
    assert_eq!(body["hasReviewed"], false);

    app.complete_purchase("u1", &product).await;
    let (_, body) = app.get(&uri).await;
    assert_eq!(body["canReview"], true);

    app.post("/api/reviews", review(&product, "u1", 5, "Green")).await;
    let (_, body) = app.get(&uri).await;
    assert_eq!(body["hasReviewed"], true);
    assert_eq!(body["canReview"], false);
    assert_eq!(body["review"]["rating"], 5);
}

#[tokio::test]
async fn test_listing_sorts_and_filters() {
    let app = TestApp::new();
    let product = app.create_product("Santal", "110").await;
    for (user, rating) in [("a", 2), ("b", 5), ("c", 4)] {
        app.complete_purchase(user, &product).await;
        app.post("/api/reviews", review(&product, user, rating, "Ok")).await;
    }

    let (_, body) = app
        .get(&format!("/api/reviews/product/{product}?sortBy=highest"))
        .await;
    let ratings: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["rating"].as_i64().unwrap())
        .collect();
    assert_eq!(ratings, vec![5, 4, 2]);

    let (_, body) = app
        .get(&format!("/api/reviews/product/{product}?filterRating=4"))
        .await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = app.get("/api/reviews/all/reviews").await;
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_malformed_bodies_use_error_format() {
    let app = TestApp::new();
    let product = app.create_product("Neroli", "45").await;

    let mut body = review(&product, "u1", 5, "Bright");
    body["rating"] = json!("five");
    let (status, body) = app.post("/api/reviews", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = app
        .raw(Method::POST, "/api/reviews", "application/json", "{\"rating\": ")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = app
        .delete(&format!("/api/reviews/{}", uuid::Uuid::new_v4()), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = app
        .get(&format!("/api/reviews/product/{product}?sortBy=bogus"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_second_review_conflicts_after_order_is_cancelled() {
    let app = TestApp::new();
    let product = app.create_product("Ambre", "95").await;
    let order = app.complete_purchase("u1", &product).await;

    let (status, _) = app.post("/api/reviews", review(&product, "u1", 4, "Warm")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .patch(
            &format!("/api/transactions/{order}"),
            json!({ "status": "cancelled" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.post("/api/reviews", review(&product, "u1", 1, "Again")).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(body["error"], "conflict");

    // Without an earlier review the missing purchase still decides.
    let (status, _) = app.post("/api/reviews", review(&product, "u2", 3, "Nope")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
