//! Sillage Storefront - Fragrance shop API server.
//!
//! Serves the JSON API on port 5000 by default.
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - `PostgreSQL` via sqlx, or an in-memory store when no database is
//!   configured (demo runs)
//! - SMTP via lettre for order status emails with an HTML receipt
//! - Product images stored on local disk and served under `/uploads`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sillage_storefront::config::StorefrontConfig;
use sillage_storefront::db::{self, MemoryStore, Stores};
use sillage_storefront::services::email::Mailer;
use sillage_storefront::services::images::ImageStorage;
use sillage_storefront::services::notifications::Notifier;
use sillage_storefront::services::profanity::ProfanityFilter;
use sillage_storefront::services::receipt::HtmlReceiptRenderer;
use sillage_storefront::state::{AppState, Collaborators};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn build_profanity_filter(config: &StorefrontConfig) -> ProfanityFilter {
    match ProfanityFilter::from_config(&config.profanity) {
        Ok(ProfanityFilter::Unconfigured) => {
            tracing::warn!("Profanity filter disabled, review text passes through");
            ProfanityFilter::Unconfigured
        }
        Ok(filter) => filter,
        Err(e) => {
            tracing::warn!(error = %e, "Profanity filter unavailable, review text passes through");
            ProfanityFilter::Unconfigured
        }
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sillage_storefront=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p sillage-cli -- migrate
    let (stores, pool) = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url)
                .await
                .expect("Failed to create database pool");
            tracing::info!("Database pool created");
            (Stores::postgres(&pool), Some(pool))
        }
        None => {
            tracing::warn!("No database configured, using the in-memory store");
            (Stores::in_memory(Arc::new(MemoryStore::new())), None)
        }
    };

    let mailer = Mailer::from_config(config.email.as_ref()).expect("Failed to build SMTP mailer");
    if !mailer.is_configured() {
        tracing::warn!("SMTP not configured, order status emails are disabled");
    }

    let collaborators = Collaborators {
        profanity: build_profanity_filter(&config),
        notifier: Notifier::new(
            mailer,
            Arc::new(HtmlReceiptRenderer),
            config.notification_timeout,
        ),
        images: ImageStorage::new(&config.uploads_dir),
    };
    let state = AppState::new(stores, pool, collaborators);

    let app = sillage_storefront::app(state, &config.uploads_dir, config.cors_origin.as_deref());

    // Start server
    let addr = config.socket_addr();
    tracing::info!("storefront listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
