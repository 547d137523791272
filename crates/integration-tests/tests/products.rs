//! Catalog API tests, including image uploads.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::Value;

use sillage_integration_tests::{Part, TestApp};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

fn image_path(app: &TestApp, reference: &Value) -> std::path::PathBuf {
    let name = reference
        .as_str()
        .unwrap()
        .strip_prefix("/uploads/products/")
        .unwrap();
    app.uploads_dir.join("products").join(name)
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".to_string()));

    let (status, _) = app.get("/health/ready").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_with_image_and_serve_it() {
    let app = TestApp::new();
    let (status, body) = app
        .multipart(
            Method::POST,
            "/api/products",
            &[
                Part::Text("name", "Vetiver Noir"),
                Part::Text("price", "89.50"),
                Part::Text("collection", "Nocturne"),
                Part::File {
                    name: "images",
                    content_type: "image/png",
                    bytes: PNG,
                },
            ],
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["volume"], "100ml");
    assert_eq!(body["stock"], 0);
    assert_eq!(body["inStock"], false);
    assert_eq!(body["reviewCount"], 0);

    let image = &body["images"][0];
    assert!(image.as_str().unwrap().ends_with(".png"));
    assert!(image_path(&app, image).exists());

    let (status, _) = app.get(image.as_str().unwrap()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_create_rejects_bad_input() {
    let app = TestApp::new();

    let (status, body) = app
        .multipart(Method::POST, "/api/products", &[Part::Text("price", "10")])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = app
        .multipart(
            Method::POST,
            "/api/products",
            &[
                Part::Text("name", "Bad"),
                Part::Text("price", "10"),
                Part::File {
                    name: "images",
                    content_type: "text/plain",
                    bytes: b"hello",
                },
            ],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get("/api/products").await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_replaces_dropped_images() {
    let app = TestApp::new();
    let (_, created) = app
        .multipart(
            Method::POST,
            "/api/products",
            &[
                Part::Text("name", "Ambre"),
                Part::Text("price", "95"),
                Part::File {
                    name: "images",
                    content_type: "image/png",
                    bytes: PNG,
                },
                Part::File {
                    name: "images",
                    content_type: "image/png",
                    bytes: PNG,
                },
            ],
        )
        .await;
    let id = created["id"].as_str().unwrap();
    let keep = created["images"][0].clone();
    let dropped = created["images"][1].clone();
    let kept_json = Value::Array(vec![keep.clone()]).to_string();

    let (status, body) = app
        .multipart(
            Method::PUT,
            &format!("/api/products/{id}"),
            &[
                Part::Text("stock", "5"),
                Part::Text("existingImages", &kept_json),
            ],
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "Ambre");
    assert_eq!(body["stock"], 5);
    assert_eq!(body["inStock"], true);
    assert_eq!(body["images"], Value::Array(vec![keep.clone()]));
    assert!(image_path(&app, &keep).exists());
    assert!(!image_path(&app, &dropped).exists());
}

#[tokio::test]
async fn test_collection_listing_and_unknown_ids() {
    let app = TestApp::new();
    app.create_product("Signature One", "50").await;

    let (_, body) = app.get("/api/products/collection/Signature").await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = app.get("/api/products/collection/Jardin").await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = app.get("/api/products/not-a-uuid").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .get(&format!("/api/products/{}", uuid::Uuid::new_v4()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_cascades_reviews() {
    let app = TestApp::new();
    let product = app.create_product("Oud", "120").await;
    app.complete_purchase("u1", &product).await;
    let (status, _) = app
        .post(
            "/api/reviews",
            serde_json::json!({
                "productId": product,
                "userId": "u1",
                "name": "Camille",
                "rating": 5,
                "title": "Deep",
                "comment": "Lasts all day",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.delete(&format!("/api/products/{product}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Product deleted successfully");

    let (_, reviews) = app.get("/api/reviews/all/reviews").await;
    assert!(reviews.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_non_multipart_create_is_validation_error() {
    let app = TestApp::new();
    let (status, body) = app
        .raw(Method::POST, "/api/products", "application/json", r#"{"name":"Iris"}"#)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}
