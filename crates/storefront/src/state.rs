//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::db::Stores;
use crate::services::cart::CartService;
use crate::services::catalog::CatalogService;
use crate::services::images::ImageStorage;
use crate::services::notifications::Notifier;
use crate::services::profanity::ProfanityFilter;
use crate::services::reviews::ReviewService;
use crate::services::transactions::TransactionService;

/// Long-lived collaborators built once at startup.
pub struct Collaborators {
    pub profanity: ProfanityFilter,
    pub notifier: Notifier,
    pub images: ImageStorage,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Services are built per call
/// from the shared stores and collaborators.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    stores: Stores,
    pool: Option<PgPool>,
    collaborators: Collaborators,
}

impl AppState {
    /// Create a new application state.
    ///
    /// `pool` is `None` when the stores are in-memory.
    #[must_use]
    pub fn new(stores: Stores, pool: Option<PgPool>, collaborators: Collaborators) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                stores,
                pool,
                collaborators,
            }),
        }
    }

    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    /// The database pool, if the stores are backed by `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn catalog(&self) -> CatalogService<'_> {
        CatalogService::new(&self.inner.stores, &self.inner.collaborators.images)
    }

    #[must_use]
    pub fn cart(&self) -> CartService<'_> {
        CartService::new(&self.inner.stores)
    }

    #[must_use]
    pub fn transactions(&self) -> TransactionService<'_> {
        TransactionService::new(&self.inner.stores, &self.inner.collaborators.notifier)
    }

    #[must_use]
    pub fn reviews(&self) -> ReviewService<'_> {
        ReviewService::new(&self.inner.stores, &self.inner.collaborators.profanity)
    }
}
