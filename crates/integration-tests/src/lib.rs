//! Integration tests for Sillage.
//!
//! Tests drive the full storefront router in-process with
//! `tower::ServiceExt::oneshot`, backed by the in-memory store, so no
//! database or running server is needed.
//!
//! ```bash
//! cargo test -p sillage-integration-tests
//! ```
//!
//! # Test Files
//!
//! - `products` - Catalog CRUD and image uploads
//! - `cart` - Cart mutations and totals
//! - `transactions` - Ledger, checkout and status transitions
//! - `reviews` - Purchase gating, moderation and rating aggregation

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use sillage_storefront::config::ProfanityConfig;
use sillage_storefront::db::{MemoryStore, Stores};
use sillage_storefront::services::email::Mailer;
use sillage_storefront::services::images::ImageStorage;
use sillage_storefront::services::notifications::Notifier;
use sillage_storefront::services::profanity::ProfanityFilter;
use sillage_storefront::services::receipt::HtmlReceiptRenderer;
use sillage_storefront::state::{AppState, Collaborators};

const BOUNDARY: &str = "sillage-test-boundary";

/// One part of a multipart request.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

/// An in-process storefront backed by a fresh in-memory store.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryStore>,
    pub uploads_dir: PathBuf,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Storefront with the profanity filter enabled and mail unconfigured.
    #[must_use]
    pub fn new() -> Self {
        Self::build(ProfanityConfig::default())
    }

    /// Storefront with the profanity filter turned off.
    #[must_use]
    pub fn without_filter() -> Self {
        Self::build(ProfanityConfig {
            enabled: false,
            extra_words: Vec::new(),
        })
    }

    fn build(profanity: ProfanityConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let uploads_dir =
            std::env::temp_dir().join(format!("sillage-it-{}", uuid::Uuid::new_v4()));

        let collaborators = Collaborators {
            profanity: ProfanityFilter::from_config(&profanity).unwrap(),
            notifier: Notifier::new(
                Mailer::Unconfigured,
                Arc::new(HtmlReceiptRenderer),
                Duration::from_secs(2),
            ),
            images: ImageStorage::new(&uploads_dir),
        };
        let state = AppState::new(Stores::in_memory(store.clone()), None, collaborators);
        let router = sillage_storefront::app(state, &uploads_dir, None);

        Self {
            router,
            store,
            uploads_dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    /// Send a request with an optional JSON body.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    /// Send a raw body with the given content type.
    pub async fn raw(&self, method: Method, uri: &str, content_type: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body.to_owned()))
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, body).await
    }

    /// Send a `multipart/form-data` request.
    pub async fn multipart(&self, method: Method, uri: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                            .as_bytes(),
                    );
                }
                Part::File {
                    name,
                    content_type,
                    bytes,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Create a product through the API and return its id.
    pub async fn create_product(&self, name: &str, price: &str) -> String {
        let (status, body) = self
            .multipart(
                Method::POST,
                "/api/products",
                &[
                    Part::Text("name", name),
                    Part::Text("price", price),
                    Part::Text("collection", "Signature"),
                    Part::Text("stock", "10"),
                ],
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    /// Record an order for one unit of a product and return the transaction id.
    pub async fn place_order(&self, user: &str, product_id: &str, price: &str) -> String {
        let (status, body) = self
            .post(
                "/api/transactions",
                json!({
                    "userId": user,
                    "email": format!("{user}@example.com"),
                    "items": [{
                        "productId": product_id,
                        "name": "Test fragrance",
                        "price": price,
                        "quantity": 1,
                    }],
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["transactionId"].as_str().unwrap().to_string()
    }

    /// Record a completed purchase of a product.
    pub async fn complete_purchase(&self, user: &str, product_id: &str) -> String {
        let id = self.place_order(user, product_id, "50").await;
        let (status, body) = self
            .patch(
                &format!("/api/transactions/{id}"),
                json!({ "status": "completed" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        id
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.uploads_dir);
    }
}
