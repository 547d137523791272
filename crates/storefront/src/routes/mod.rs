//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                                   - Liveness
//! GET    /health/ready                             - Readiness (database)
//!
//! # Catalog
//! GET    /api/products                             - All products, newest first
//! GET    /api/products/{id}                        - Product detail
//! GET    /api/products/collection/{name}           - Products in a collection
//! POST   /api/products                             - Create (multipart)
//! PUT    /api/products/{id}                        - Partial update (multipart)
//! DELETE /api/products/{id}                        - Delete with images
//!
//! # Reviews
//! GET    /api/reviews/all/reviews                  - Recent reviews (moderation)
//! GET    /api/reviews/product/{id}                 - ?sortBy=&filterRating=
//! GET    /api/reviews/product/{id}/stats           - Average and distribution
//! GET    /api/reviews/product/{id}/user/{user}/check - Eligibility
//! POST   /api/reviews                              - Submit
//! PUT    /api/reviews/{id}                         - Edit (owner only)
//! DELETE /api/reviews/{id}                         - Delete (owner or admin)
//!
//! # Transactions
//! POST   /api/transactions                         - Record an order
//! POST   /api/transactions/checkout/{user}         - Order from the cart
//! GET    /api/transactions                         - ?status=&limit=
//! GET    /api/transactions/summary                 - Counts and revenue
//! GET    /api/transactions/user/{user}
//! GET    /api/transactions/email/{email}
//! GET    /api/transactions/{id}
//! PATCH  /api/transactions/{id}                    - Status change
//! DELETE /api/transactions/{id}
//!
//! # Cart
//! GET    /api/cart/{user}
//! POST   /api/cart/{user}                          - Add item
//! PATCH  /api/cart/{user}/item/{line}              - Set quantity
//! DELETE /api/cart/{user}/item/{line}              - Remove item
//! DELETE /api/cart/{user}                          - Clear
//! ```

pub mod cart;
pub mod extract;
pub mod products;
pub mod reviews;
pub mod transactions;

use std::str::FromStr;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, patch, post, put},
};

use crate::error::{AppError, Result};
use crate::services::images::{MAX_IMAGE_BYTES, MAX_IMAGES};
use crate::state::AppState;

/// Request body ceiling for multipart product writes.
const PRODUCT_BODY_LIMIT: usize = MAX_IMAGES * MAX_IMAGE_BYTES + 1024 * 1024;

/// Parse an id from a path segment. A malformed id cannot name an existing
/// resource, so it reads as not found.
pub(crate) fn parse_id<T: FromStr>(raw: &str, not_found: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::not_found(not_found))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::destroy),
        )
        .route("/collection/{name}", get(products::by_collection))
        .layer(DefaultBodyLimit::max(PRODUCT_BODY_LIMIT))
}

/// Create the review routes router.
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(reviews::create))
        .route("/all/reviews", get(reviews::recent))
        .route("/product/{id}", get(reviews::for_product))
        .route("/product/{id}/stats", get(reviews::stats))
        .route("/product/{id}/user/{user}/check", get(reviews::check))
        .route("/{id}", put(reviews::update).delete(reviews::destroy))
}

/// Create the transaction routes router.
pub fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(transactions::index).post(transactions::create))
        .route("/summary", get(transactions::summary))
        .route("/checkout/{user}", post(transactions::checkout))
        .route("/user/{user}", get(transactions::for_user))
        .route("/email/{email}", get(transactions::for_email))
        .route(
            "/{id}",
            get(transactions::show)
                .patch(transactions::update_status)
                .delete(transactions::destroy),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/{user}", get(cart::show).post(cart::add).delete(cart::clear))
        .route(
            "/{user}/item/{line}",
            patch(cart::set_quantity).delete(cart::remove),
        )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/products", product_routes())
        .nest("/api/reviews", review_routes())
        .nest("/api/transactions", transaction_routes())
        .nest("/api/cart", cart_routes())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity when running against `PostgreSQL`.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.pool() else {
        return StatusCode::OK;
    };
    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
