//! Sillage Storefront library.
//!
//! JSON API for the fragrance catalog, carts, the order ledger and
//! purchase-gated reviews. The router is exposed as a library so the binary
//! and the integration tests build exactly the same application.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use std::path::Path;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the CORS layer. Without a configured origin any origin is allowed.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin.and_then(|o| HeaderValue::from_str(o).ok()) {
        Some(origin) => AllowOrigin::exact(origin),
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE])
}

/// Build the full application router.
///
/// Uploaded images are served from `uploads_dir` under `/uploads`.
pub fn app(state: AppState, uploads_dir: &Path, cors_origin: Option<&str>) -> Router {
    Router::new()
        .merge(routes::routes())
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origin))
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
