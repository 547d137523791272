//! Persistence for the storefront.
//!
//! # Database: `sillage`
//!
//! All tables live in the `storefront` schema:
//!
//! - `product` - Catalog entries with derived rating columns
//! - `review` - One review per (product, user)
//! - `transaction` - Order ledger; line snapshots stored as JSONB
//! - `cart` / `cart_line` - One cart per user, one line per product
//!
//! Each table is reached through an async store trait so the service layer
//! can run against either [`Stores::postgres`] or [`Stores::in_memory`].
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p sillage-cli -- migrate
//! ```

pub mod carts;
pub mod memory;
pub mod products;
pub mod reviews;
pub mod transactions;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use sillage_core::{
    ProductId, Rating, RatingSummary, ReviewId, TransactionId, TransactionStatus, UserId,
};

use crate::models::{
    Cart, LedgerSummary, NewReview, NewTransaction, Product, ProductDetails, Review,
    StatusChange, Transaction, TransactionQuery,
};

pub use memory::MemoryStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate review).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Store is unreachable (in-memory store failure injection).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Map an insert/update failure, turning constraint violations into domain errors.
///
/// Unique violations become [`RepositoryError::Conflict`] with `conflict`
/// as the message. Foreign key violations become [`RepositoryError::NotFound`].
pub(crate) fn map_write_error(e: sqlx::Error, conflict: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(conflict.to_owned());
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::NotFound;
        }
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Catalog persistence.
///
/// Rating columns are only written through [`ProductStore::set_rating`].
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All products, or those of one collection, newest first.
    async fn list(&self, collection: Option<&str>) -> Result<Vec<Product>, RepositoryError>;

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Fetch several products. Missing ids are skipped; order is unspecified.
    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Insert a product with an empty rating.
    async fn insert(&self, details: &ProductDetails) -> Result<Product, RepositoryError>;

    /// Replace the editable fields of a product.
    ///
    /// Returns [`RepositoryError::NotFound`] if the product does not exist.
    async fn update(
        &self,
        id: ProductId,
        details: &ProductDetails,
    ) -> Result<Product, RepositoryError>;

    /// Write the derived rating fields.
    async fn set_rating(&self, id: ProductId, rating: RatingSummary)
    -> Result<(), RepositoryError>;

    /// Delete a product along with its reviews and cart lines.
    async fn delete(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;
}

/// Review persistence. Enforces one review per (product, user).
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Reviews of a product, newest first.
    async fn list_for_product(&self, product_id: ProductId)
    -> Result<Vec<Review>, RepositoryError>;

    /// Most recent reviews across all products.
    async fn list_recent(&self, limit: u32) -> Result<Vec<Review>, RepositoryError>;

    /// All ratings recorded for a product.
    async fn ratings_for_product(&self, product_id: ProductId)
    -> Result<Vec<Rating>, RepositoryError>;

    async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError>;

    async fn find_by_author(
        &self,
        product_id: ProductId,
        user_id: &UserId,
    ) -> Result<Option<Review>, RepositoryError>;

    /// Insert a review.
    ///
    /// Returns [`RepositoryError::Conflict`] if the user already reviewed the
    /// product and [`RepositoryError::NotFound`] if the product is gone.
    async fn insert(&self, review: NewReview) -> Result<Review, RepositoryError>;

    /// Persist the rating, text and `updated_at` of an existing review.
    async fn update(&self, review: &Review) -> Result<Review, RepositoryError>;

    async fn delete(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError>;
}

/// Order ledger persistence.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Record a new pending transaction.
    async fn insert(&self, transaction: NewTransaction) -> Result<Transaction, RepositoryError>;

    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>, RepositoryError>;

    /// Transactions matching the query, newest first.
    async fn list(&self, query: &TransactionQuery) -> Result<Vec<Transaction>, RepositoryError>;

    /// Whether the user has a completed transaction containing the product.
    async fn has_completed_purchase(
        &self,
        user_id: &UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError>;

    /// Atomically set a transaction's status, returning the previous status.
    ///
    /// `completed_at` overwrites the stored value when `Some` and leaves it
    /// untouched when `None`. Returns `None` if the transaction does not exist.
    async fn set_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<StatusChange>, RepositoryError>;

    /// Delete a transaction. Returns whether a row was removed.
    async fn delete(&self, id: TransactionId) -> Result<bool, RepositoryError>;

    /// Counts per status and completed revenue.
    async fn summary(&self) -> Result<LedgerSummary, RepositoryError>;
}

/// Cart persistence. Each user owns exactly one cart.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The user's cart, created empty on first access.
    async fn get_or_create(&self, user_id: &UserId) -> Result<Cart, RepositoryError>;

    /// Replace the stored lines with those of `cart` and bump `updated_at`.
    async fn save(&self, cart: &Cart) -> Result<Cart, RepositoryError>;
}

/// The four stores, shared by every request.
#[derive(Clone)]
pub struct Stores {
    pub products: Arc<dyn ProductStore>,
    pub reviews: Arc<dyn ReviewStore>,
    pub transactions: Arc<dyn TransactionStore>,
    pub carts: Arc<dyn CartStore>,
}

impl Stores {
    /// Stores backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            products: Arc::new(products::PgProductStore::new(pool.clone())),
            reviews: Arc::new(reviews::PgReviewStore::new(pool.clone())),
            transactions: Arc::new(transactions::PgTransactionStore::new(pool.clone())),
            carts: Arc::new(carts::PgCartStore::new(pool.clone())),
        }
    }

    /// Stores backed by a single shared [`MemoryStore`].
    #[must_use]
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            products: store.clone(),
            reviews: store.clone(),
            transactions: store.clone(),
            carts: store,
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
