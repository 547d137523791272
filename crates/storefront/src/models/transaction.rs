//! Order ledger domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sillage_core::{CartTotals, Email, ProductId, TransactionId, TransactionStatus, UserId};

use super::product::Product;

/// A line of a placed order, frozen at order time.
///
/// The snapshot copies product display data so receipts stay stable when the
/// catalog entry is later edited or deleted. Fields are private; a snapshot
/// is never modified after it is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineSnapshot {
    product_id: ProductId,
    name: String,
    price: Decimal,
    quantity: u32,
    image: Option<String>,
    collection: Option<String>,
}

impl OrderLineSnapshot {
    /// Build a snapshot from already-validated line data.
    #[must_use]
    pub const fn new(
        product_id: ProductId,
        name: String,
        price: Decimal,
        quantity: u32,
        image: Option<String>,
        collection: Option<String>,
    ) -> Self {
        Self {
            product_id,
            name,
            price,
            quantity,
            image,
            collection,
        }
    }

    /// Freeze the current catalog data of a product.
    #[must_use]
    pub fn freeze(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            name: product.details.name.clone(),
            price: product.details.price,
            quantity,
            image: product.primary_image().map(str::to_owned),
            collection: Some(product.details.collection.clone()),
        }
    }

    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.product_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn price(&self) -> Decimal {
        self.price
    }

    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    #[must_use]
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Monetary totals recorded on a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

impl From<CartTotals> for OrderTotals {
    fn from(totals: CartTotals) -> Self {
        Self {
            subtotal: totals.subtotal,
            tax: totals.tax,
            shipping: totals.shipping,
            total: totals.total,
        }
    }
}

/// A recorded order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub email: Email,
    pub items: Vec<OrderLineSnapshot>,
    #[serde(flatten)]
    pub totals: OrderTotals,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    /// Time of the most recent transition into `completed`.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Whether any line references the product.
    #[must_use]
    pub fn includes_product(&self, product_id: ProductId) -> bool {
        self.items.iter().any(|item| item.product_id == product_id)
    }

    /// Short human-friendly order number for receipts.
    #[must_use]
    pub fn order_number(&self) -> String {
        let simple = self.id.as_uuid().simple().to_string();
        simple
            .get(..8)
            .unwrap_or(&simple)
            .to_ascii_uppercase()
    }
}

/// Parameters for recording a new transaction. Status always starts as pending.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub email: Email,
    pub items: Vec<OrderLineSnapshot>,
    pub totals: OrderTotals,
}

/// Filters for listing transactions. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub user_id: Option<UserId>,
    pub email: Option<Email>,
    pub status: Option<TransactionStatus>,
    pub limit: Option<u32>,
}

impl TransactionQuery {
    /// Page size used when `limit` is not given.
    pub const DEFAULT_LIMIT: u32 = 100;

    /// The requested limit, or [`Self::DEFAULT_LIMIT`].
    #[must_use]
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }

    /// Whether a transaction passes the filters (ignores `limit`).
    #[must_use]
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.user_id
            .as_ref()
            .is_none_or(|user| *user == transaction.user_id)
            && self
                .email
                .as_ref()
                .is_none_or(|email| *email == transaction.email)
            && self.status.is_none_or(|status| status == transaction.status)
    }
}

/// Result of a committed status write.
#[derive(Debug, Clone)]
pub struct StatusChange {
    /// Status before the write.
    pub previous: TransactionStatus,
    /// The transaction after the write.
    pub transaction: Transaction,
}

/// Per-status counts and completed revenue for the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub pending: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub failed: u64,
    /// Sum of totals of completed transactions.
    pub revenue: Decimal,
}

impl LedgerSummary {
    /// Add `count` transactions of a status with the given summed total.
    pub fn record(&mut self, status: TransactionStatus, count: u64, total: Decimal) {
        match status {
            TransactionStatus::Pending => self.pending += count,
            TransactionStatus::Completed => {
                self.completed += count;
                self.revenue += total;
            }
            TransactionStatus::Cancelled => self.cancelled += count,
            TransactionStatus::Failed => self.failed += count,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sillage_core::RatingSummary;

    use super::*;
    use crate::models::product::tests::sample_details;

    #[test]
    fn test_freeze_copies_display_data() {
        let mut product = Product {
            id: ProductId::generate(),
            details: sample_details("Oud Royale", "120"),
            rating: RatingSummary::EMPTY,
            created_at: Utc::now(),
        };

        let snapshot = OrderLineSnapshot::freeze(&product, 2);
        product.details.price = "999".parse().unwrap();
        product.details.name = "Renamed".to_string();

        assert_eq!(snapshot.name(), "Oud Royale");
        assert_eq!(snapshot.price(), "120".parse::<Decimal>().unwrap());
        assert_eq!(snapshot.line_total(), "240".parse::<Decimal>().unwrap());
        assert_eq!(snapshot.collection(), Some("Signature"));
        assert_eq!(snapshot.image(), Some("/uploads/products/product-a.jpg"));
    }

    #[test]
    fn test_snapshot_json_uses_camel_case() {
        let snapshot = OrderLineSnapshot::new(
            ProductId::generate(),
            "Neroli".to_string(),
            "35.00".parse().unwrap(),
            1,
            None,
            Some("Citrus".to_string()),
        );
        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("productId").is_some());
        assert_eq!(json["collection"], "Citrus");
    }

    #[test]
    fn test_ledger_summary_revenue_counts_completed_only() {
        let mut summary = LedgerSummary::default();
        summary.record(TransactionStatus::Completed, 2, "150".parse().unwrap());
        summary.record(TransactionStatus::Pending, 1, "80".parse().unwrap());
        summary.record(TransactionStatus::Failed, 1, "10".parse().unwrap());

        assert_eq!(summary.completed, 2);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.revenue, "150".parse::<Decimal>().unwrap());
    }
}
