//! Order ledger operations and status transitions.
//!
//! Every transition between the four statuses is permitted. A status write
//! commits first; the customer notification runs afterwards and its outcome
//! is reported alongside the transaction.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use sillage_core::{CartTotals, Email, ProductId, TransactionId, TransactionStatus, UserId};

use super::notifications::{NotificationOutcome, Notifier};
use crate::db::Stores;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::{
    CartLineRef, LedgerSummary, NewTransaction, OrderLineSnapshot, OrderTotals, Transaction,
    TransactionQuery,
};

/// A line of a client-submitted order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSubmission {
    pub product_id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: i64,
    pub image: Option<String>,
    pub collection: Option<String>,
}

/// A client-submitted order.
///
/// Totals are optional; when any is missing all four are computed from the
/// lines with the cart pricing rules.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSubmission {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub items: Option<Vec<LineSubmission>>,
    pub subtotal: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub shipping: Option<Decimal>,
    pub total: Option<Decimal>,
}

/// Result of a status change: the committed transaction and what happened to
/// the customer notification.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub transaction: Transaction,
    pub notification: NotificationOutcome,
}

fn snapshot(line: &LineSubmission) -> Result<OrderLineSnapshot> {
    let product_id: ProductId = line
        .product_id
        .trim()
        .parse()
        .map_err(|_| AppError::validation("item productId is not a valid id"))?;
    let name = line.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("item name is required"));
    }
    if line.price.is_sign_negative() {
        return Err(AppError::validation("item price cannot be negative"));
    }
    let quantity = CartLineRef::validate_quantity(line.quantity)
        .map_err(|e| AppError::validation(e.to_string()))?;

    Ok(OrderLineSnapshot::new(
        product_id,
        name.to_owned(),
        line.price,
        quantity,
        line.image.clone(),
        line.collection.clone(),
    ))
}

fn order_totals(submission: &TransactionSubmission, items: &[OrderLineSnapshot]) -> Result<OrderTotals> {
    let totals = match (
        submission.subtotal,
        submission.tax,
        submission.shipping,
        submission.total,
    ) {
        (Some(subtotal), Some(tax), Some(shipping), Some(total)) => OrderTotals {
            subtotal,
            tax,
            shipping,
            total,
        },
        _ => CartTotals::compute(items.iter().map(|i| (i.price(), i.quantity()))).into(),
    };

    if [totals.subtotal, totals.tax, totals.shipping, totals.total]
        .iter()
        .any(Decimal::is_sign_negative)
    {
        return Err(AppError::validation("totals cannot be negative"));
    }
    Ok(totals)
}

/// Ledger operations over the shared stores.
pub struct TransactionService<'a> {
    stores: &'a Stores,
    notifier: &'a Notifier,
}

impl<'a> TransactionService<'a> {
    #[must_use]
    pub const fn new(stores: &'a Stores, notifier: &'a Notifier) -> Self {
        Self { stores, notifier }
    }

    /// Record a new order. Status always starts as pending.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for missing or malformed fields.
    #[instrument(skip(self, submission))]
    pub async fn create(&self, submission: TransactionSubmission) -> Result<Transaction> {
        let user_id = submission
            .user_id
            .as_deref()
            .map(UserId::parse)
            .transpose()
            .map_err(|e| AppError::validation(e.to_string()))?;
        let email = submission
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| AppError::validation(e.to_string()))?;
        let lines = submission.items.as_deref().unwrap_or_default();

        let (Some(user_id), Some(email)) = (user_id, email) else {
            return Err(AppError::validation("userId, email, and items are required"));
        };
        if lines.is_empty() {
            return Err(AppError::validation("userId, email, and items are required"));
        }

        let items = lines.iter().map(snapshot).collect::<Result<Vec<_>>>()?;
        let totals = order_totals(&submission, &items)?;

        let transaction = self
            .stores
            .transactions
            .insert(NewTransaction {
                user_id,
                email,
                items,
                totals,
            })
            .await?;

        tracing::info!(transaction_id = %transaction.id, total = %transaction.totals.total, "Transaction created");
        Ok(transaction)
    }

    /// Turn the user's cart into a pending transaction and empty the cart.
    ///
    /// Each cart line is frozen at the product's current catalog data. Lines
    /// whose product no longer exists are dropped.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an invalid email or an empty cart.
    #[instrument(skip(self, email), fields(user_id = %user_id))]
    pub async fn checkout(&self, user_id: &UserId, email: &str) -> Result<Transaction> {
        let email = Email::parse(email).map_err(|e| AppError::validation(e.to_string()))?;
        let mut cart = self.stores.carts.get_or_create(user_id).await?;

        let products = self.stores.products.get_many(&cart.product_ids()).await?;
        let items: Vec<OrderLineSnapshot> = cart
            .lines
            .iter()
            .filter_map(|line| {
                products
                    .iter()
                    .find(|p| p.id == line.product_id)
                    .map(|product| OrderLineSnapshot::freeze(product, line.quantity))
            })
            .collect();

        if items.is_empty() {
            return Err(AppError::validation("Cart is empty"));
        }

        let totals = CartTotals::compute(items.iter().map(|i| (i.price(), i.quantity())));
        let transaction = self
            .stores
            .transactions
            .insert(NewTransaction {
                user_id: user_id.clone(),
                email,
                items,
                totals: totals.into(),
            })
            .await?;

        cart.clear();
        self.stores.carts.save(&cart).await?;

        add_breadcrumb(
            "checkout",
            "Cart checked out",
            &[("transaction_id", &transaction.id.to_string())],
        );
        tracing::info!(transaction_id = %transaction.id, items = totals.item_count, "Checkout complete");
        Ok(transaction)
    }

    /// # Errors
    ///
    /// Returns `NotFound` if the transaction does not exist.
    pub async fn get(&self, id: TransactionId) -> Result<Transaction> {
        self.stores
            .transactions
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("Transaction not found"))
    }

    /// # Errors
    ///
    /// Returns `Database` if the store fails.
    pub async fn list(&self, query: &TransactionQuery) -> Result<Vec<Transaction>> {
        Ok(self.stores.transactions.list(query).await?)
    }

    /// Apply a status change.
    ///
    /// `completed_at` is set to now on every transition into `completed` and
    /// left alone otherwise. The notification only runs if the status
    /// actually changed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing transaction. Notification problems
    /// are never errors.
    #[instrument(skip(self), fields(transaction_id = %id))]
    pub async fn update_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<StatusUpdate> {
        let completed_at = status.is_completed().then(Utc::now);
        let change = self
            .stores
            .transactions
            .set_status(id, status, completed_at)
            .await?
            .ok_or_else(|| AppError::not_found("Transaction not found"))?;

        tracing::info!(from = %change.previous, to = %status, "Transaction status updated");

        let notification = if change.previous == status {
            NotificationOutcome::Skipped
        } else {
            self.notifier.status_changed(&change.transaction).await
        };

        Ok(StatusUpdate {
            transaction: change.transaction,
            notification,
        })
    }

    /// # Errors
    ///
    /// Returns `NotFound` if the transaction does not exist.
    #[instrument(skip(self), fields(transaction_id = %id))]
    pub async fn delete(&self, id: TransactionId) -> Result<()> {
        if !self.stores.transactions.delete(id).await? {
            return Err(AppError::not_found("Transaction not found"));
        }
        tracing::info!("Transaction deleted");
        Ok(())
    }

    /// Counts per status and completed revenue.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the store fails.
    pub async fn summary(&self) -> Result<LedgerSummary> {
        Ok(self.stores.transactions.summary().await?)
    }
}
