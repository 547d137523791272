//! `PostgreSQL` order ledger store.
//!
//! Line items are stored as a JSONB array of [`OrderLineSnapshot`] values so
//! a transaction is read and written as a single row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;
use uuid::Uuid;

use sillage_core::{Email, ProductId, TransactionId, TransactionStatus, UserId};

use super::{RepositoryError, TransactionStore};
use crate::models::{
    LedgerSummary, NewTransaction, OrderLineSnapshot, OrderTotals, StatusChange, Transaction,
    TransactionQuery,
};

const TRANSACTION_COLUMNS: &str =
    "id, user_id, email, items, subtotal, tax, shipping, total, status, created_at, completed_at";

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: String,
    email: String,
    items: Json<Vec<OrderLineSnapshot>>,
    subtotal: Decimal,
    tax: Decimal,
    shipping: Decimal,
    total: Decimal,
    status: TransactionStatus,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = RepositoryError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let user_id = UserId::parse(&row.user_id).map_err(|e| {
            RepositoryError::DataCorruption(format!("transaction {}: {e}", row.id))
        })?;
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: TransactionId::from_uuid(row.id),
            user_id,
            email,
            items: row.items.0,
            totals: OrderTotals {
                subtotal: row.subtotal,
                tax: row.tax,
                shipping: row.shipping,
                total: row.total,
            },
            status: row.status,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StatusChangeRow {
    previous_status: TransactionStatus,
    #[sqlx(flatten)]
    transaction: TransactionRow,
}

#[derive(sqlx::FromRow)]
struct StatusCountRow {
    status: TransactionStatus,
    count: i64,
    total: Option<Decimal>,
}

/// Order ledger backed by `storefront.transaction`.
#[derive(Debug, Clone)]
pub struct PgTransactionStore {
    pool: PgPool,
}

impl PgTransactionStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    #[instrument(skip(self, transaction), fields(user_id = %transaction.user_id))]
    async fn insert(&self, transaction: NewTransaction) -> Result<Transaction, RepositoryError> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r"
            INSERT INTO storefront.transaction
                (id, user_id, email, items, subtotal, tax, shipping, total, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')
            RETURNING {TRANSACTION_COLUMNS}
            "
        ))
        .bind(TransactionId::generate())
        .bind(&transaction.user_id)
        .bind(&transaction.email)
        .bind(Json(&transaction.items))
        .bind(transaction.totals.subtotal)
        .bind(transaction.totals.tax)
        .bind(transaction.totals.shipping)
        .bind(transaction.totals.total)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| super::map_write_error(e, "transaction already exists"))?;

        Transaction::try_from(row)
    }

    #[instrument(skip(self), fields(transaction_id = %id))]
    async fn get(&self, id: TransactionId) -> Result<Option<Transaction>, RepositoryError> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM storefront.transaction WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Transaction::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn list(&self, query: &TransactionQuery) -> Result<Vec<Transaction>, RepositoryError> {
        let limit = query.effective_limit();

        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            r"
            SELECT {TRANSACTION_COLUMNS}
            FROM storefront.transaction
            WHERE ($1::text IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR email = $2)
              AND ($3::storefront.transaction_status IS NULL OR status = $3)
            ORDER BY created_at DESC
            LIMIT $4
            "
        ))
        .bind(query.user_id.as_ref())
        .bind(query.email.as_ref())
        .bind(query.status)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    async fn has_completed_purchase(
        &self,
        user_id: &UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let (found,): (bool,) = sqlx::query_as(
            r"
            SELECT EXISTS (
                SELECT 1
                FROM storefront.transaction
                WHERE user_id = $1
                  AND status = 'completed'
                  AND items @> jsonb_build_array(jsonb_build_object('productId', $2::text))
            )
            ",
        )
        .bind(user_id)
        .bind(product_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(found)
    }

    #[instrument(skip(self), fields(transaction_id = %id, status = %status))]
    async fn set_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<StatusChange>, RepositoryError> {
        // The CTE locks the row so the returned previous status is the one
        // this write replaced.
        let row = sqlx::query_as::<_, StatusChangeRow>(
            r"
            WITH previous AS (
                SELECT id, status
                FROM storefront.transaction
                WHERE id = $1
                FOR UPDATE
            )
            UPDATE storefront.transaction t
            SET status = $2,
                completed_at = COALESCE($3, t.completed_at)
            FROM previous
            WHERE t.id = previous.id
            RETURNING previous.status AS previous_status,
                      t.id, t.user_id, t.email, t.items, t.subtotal, t.tax, t.shipping,
                      t.total, t.status, t.created_at, t.completed_at
            ",
        )
        .bind(id)
        .bind(status)
        .bind(completed_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(StatusChange {
                previous: r.previous_status,
                transaction: Transaction::try_from(r.transaction)?,
            })
        })
        .transpose()
    }

    #[instrument(skip(self), fields(transaction_id = %id))]
    async fn delete(&self, id: TransactionId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.transaction WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn summary(&self) -> Result<LedgerSummary, RepositoryError> {
        let rows: Vec<StatusCountRow> = sqlx::query_as(
            r"
            SELECT status, COUNT(*) AS count, SUM(total) AS total
            FROM storefront.transaction
            GROUP BY status
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut summary = LedgerSummary::default();
        for row in rows {
            let count = u64::try_from(row.count).unwrap_or_default();
            summary.record(row.status, count, row.total.unwrap_or_default());
        }
        Ok(summary)
    }
}
