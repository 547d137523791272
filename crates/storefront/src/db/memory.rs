//! In-memory implementation of every store.
//!
//! Used by the test suites and by demo runs without a database. All state
//! sits behind one lock, so uniqueness checks and cascades happen atomically
//! with the write they guard.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use sillage_core::{
    ProductId, Rating, RatingSummary, ReviewId, TransactionId, TransactionStatus, UserId,
};

use super::{CartStore, ProductStore, RepositoryError, ReviewStore, TransactionStore};
use crate::models::{
    Cart, LedgerSummary, NewReview, NewTransaction, Product, ProductDetails, Review,
    StatusChange, Transaction, TransactionQuery,
};

#[derive(Debug, Default)]
struct State {
    // Vectors keep insertion order; "newest first" is reverse order.
    products: Vec<Product>,
    reviews: Vec<Review>,
    transactions: Vec<Transaction>,
    carts: Vec<Cart>,
}

/// Process-local store implementing all four store traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    fail_transaction_reads: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every transaction read fail with [`RepositoryError::Unavailable`].
    pub fn set_fail_transaction_reads(&self, fail: bool) {
        self.fail_transaction_reads.store(fail, Ordering::SeqCst);
    }

    /// Insert a fully-formed transaction, bypassing the pending-only rule.
    ///
    /// Intended for seeding fixtures.
    pub async fn put_transaction(&self, transaction: Transaction) {
        self.state.write().await.transactions.push(transaction);
    }

    /// Number of carts, for asserting the one-cart-per-user rule.
    pub async fn cart_count(&self) -> usize {
        self.state.read().await.carts.len()
    }

    fn check_transaction_reads(&self) -> Result<(), RepositoryError> {
        if self.fail_transaction_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "transaction store is unreachable".to_owned(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list(&self, collection: Option<&str>) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .products
            .iter()
            .rev()
            .filter(|p| collection.is_none_or(|c| p.details.collection == c))
            .cloned()
            .collect())
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.products.iter().find(|p| p.id == id).cloned())
    }

    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn insert(&self, details: &ProductDetails) -> Result<Product, RepositoryError> {
        let product = Product {
            id: ProductId::generate(),
            details: details.clone(),
            rating: RatingSummary::EMPTY,
            created_at: Utc::now(),
        };
        self.state.write().await.products.push(product.clone());
        Ok(product)
    }

    async fn update(
        &self,
        id: ProductId,
        details: &ProductDetails,
    ) -> Result<Product, RepositoryError> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;
        product.details = details.clone();
        Ok(product.clone())
    }

    async fn set_rating(
        &self,
        id: ProductId,
        rating: RatingSummary,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let product = state
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;
        product.rating = rating;
        Ok(())
    }

    async fn delete(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(index) = state.products.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        let product = state.products.remove(index);

        state.reviews.retain(|r| r.product_id != id);
        for cart in &mut state.carts {
            cart.lines.retain(|l| l.product_id != id);
        }
        Ok(Some(product))
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .iter()
            .rev()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<Review>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .iter()
            .rev()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn ratings_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Rating>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .iter()
            .filter(|r| r.product_id == product_id)
            .map(|r| r.rating)
            .collect())
    }

    async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_author(
        &self,
        product_id: ProductId,
        user_id: &UserId,
    ) -> Result<Option<Review>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .iter()
            .find(|r| r.product_id == product_id && r.user_id == *user_id)
            .cloned())
    }

    async fn insert(&self, review: NewReview) -> Result<Review, RepositoryError> {
        let mut state = self.state.write().await;

        if !state.products.iter().any(|p| p.id == review.product_id) {
            return Err(RepositoryError::NotFound);
        }
        if state
            .reviews
            .iter()
            .any(|r| r.product_id == review.product_id && r.user_id == review.user_id)
        {
            return Err(RepositoryError::Conflict(
                "you have already reviewed this product".to_owned(),
            ));
        }

        let now = Utc::now();
        let review = Review {
            id: ReviewId::generate(),
            product_id: review.product_id,
            user_id: review.user_id,
            name: review.name,
            rating: review.rating,
            title: review.title,
            comment: review.comment,
            verified_purchase: review.verified_purchase,
            helpful_count: 0,
            created_at: now,
            updated_at: now,
        };
        state.reviews.push(review.clone());
        Ok(review)
    }

    async fn update(&self, review: &Review) -> Result<Review, RepositoryError> {
        let mut state = self.state.write().await;
        let stored = state
            .reviews
            .iter_mut()
            .find(|r| r.id == review.id)
            .ok_or(RepositoryError::NotFound)?;

        stored.rating = review.rating;
        stored.title.clone_from(&review.title);
        stored.comment.clone_from(&review.comment);
        stored.updated_at = review.updated_at;
        Ok(stored.clone())
    }

    async fn delete(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let mut state = self.state.write().await;
        Ok(state
            .reviews
            .iter()
            .position(|r| r.id == id)
            .map(|index| state.reviews.remove(index)))
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn insert(&self, transaction: NewTransaction) -> Result<Transaction, RepositoryError> {
        let transaction = Transaction {
            id: TransactionId::generate(),
            user_id: transaction.user_id,
            email: transaction.email,
            items: transaction.items,
            totals: transaction.totals,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.state
            .write()
            .await
            .transactions
            .push(transaction.clone());
        Ok(transaction)
    }

    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>, RepositoryError> {
        self.check_transaction_reads()?;
        let state = self.state.read().await;
        Ok(state.transactions.iter().find(|t| t.id == id).cloned())
    }

    async fn list(&self, query: &TransactionQuery) -> Result<Vec<Transaction>, RepositoryError> {
        self.check_transaction_reads()?;
        let state = self.state.read().await;
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|t| query.matches(t))
            .take(usize::try_from(query.effective_limit()).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn has_completed_purchase(
        &self,
        user_id: &UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        self.check_transaction_reads()?;
        let state = self.state.read().await;
        Ok(state.transactions.iter().any(|t| {
            t.user_id == *user_id && t.status.is_completed() && t.includes_product(product_id)
        }))
    }

    async fn set_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<StatusChange>, RepositoryError> {
        let mut state = self.state.write().await;
        let Some(transaction) = state.transactions.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };

        let previous = transaction.status;
        transaction.status = status;
        if completed_at.is_some() {
            transaction.completed_at = completed_at;
        }
        Ok(Some(StatusChange {
            previous,
            transaction: transaction.clone(),
        }))
    }

    async fn delete(&self, id: TransactionId) -> Result<bool, RepositoryError> {
        let mut state = self.state.write().await;
        let before = state.transactions.len();
        state.transactions.retain(|t| t.id != id);
        Ok(state.transactions.len() < before)
    }

    async fn summary(&self) -> Result<LedgerSummary, RepositoryError> {
        self.check_transaction_reads()?;
        let state = self.state.read().await;
        let mut summary = LedgerSummary::default();
        for transaction in &state.transactions {
            summary.record(transaction.status, 1, transaction.totals.total);
        }
        Ok(summary)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn get_or_create(&self, user_id: &UserId) -> Result<Cart, RepositoryError> {
        let mut state = self.state.write().await;
        if let Some(cart) = state.carts.iter().find(|c| c.user_id == *user_id) {
            return Ok(cart.clone());
        }
        let cart = Cart::empty(user_id.clone());
        state.carts.push(cart.clone());
        Ok(cart)
    }

    async fn save(&self, cart: &Cart) -> Result<Cart, RepositoryError> {
        let mut state = self.state.write().await;

        let mut seen = HashSet::new();
        if !cart.lines.iter().all(|l| seen.insert(l.product_id)) {
            return Err(RepositoryError::Conflict(
                "cart already contains this product".to_owned(),
            ));
        }
        if !cart
            .lines
            .iter()
            .all(|l| state.products.iter().any(|p| p.id == l.product_id))
        {
            return Err(RepositoryError::NotFound);
        }

        let stored = state
            .carts
            .iter_mut()
            .find(|c| c.id == cart.id)
            .ok_or(RepositoryError::NotFound)?;
        stored.lines.clone_from(&cart.lines);
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}
