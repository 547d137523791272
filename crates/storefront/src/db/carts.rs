//! `PostgreSQL` cart store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use sillage_core::{CartId, CartLineId, ProductId, UserId};

use super::{CartStore, RepositoryError, map_write_error};
use crate::models::{Cart, CartLineRef};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: Uuid,
    product_id: Uuid,
    quantity: i32,
}

impl TryFrom<CartLineRow> for CartLineRef {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("cart line {}: invalid quantity", row.id))
        })?;

        Ok(Self {
            id: CartLineId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            quantity,
        })
    }
}

/// Cart store backed by `storefront.cart` and `storefront.cart_line`.
#[derive(Debug, Clone)]
pub struct PgCartStore {
    pool: PgPool,
}

impl PgCartStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_lines(&self, cart_id: Uuid) -> Result<Vec<CartLineRef>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT id, product_id, quantity
            FROM storefront.cart_line
            WHERE cart_id = $1
            ORDER BY position
            ",
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CartLineRef::try_from).collect()
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn get_or_create(&self, user_id: &UserId) -> Result<Cart, RepositoryError> {
        // The unique index on user_id makes concurrent first accesses converge
        // on a single cart.
        sqlx::query(
            r"
            INSERT INTO storefront.cart (id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(CartId::generate())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        let cart = sqlx::query_as::<_, CartRow>(
            "SELECT id, updated_at FROM storefront.cart WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let lines = self.load_lines(cart.id).await?;

        Ok(Cart {
            id: CartId::from_uuid(cart.id),
            user_id: user_id.clone(),
            lines,
            updated_at: cart.updated_at,
        })
    }

    #[instrument(skip(self, cart), fields(cart_id = %cart.id, lines = cart.lines.len()))]
    async fn save(&self, cart: &Cart) -> Result<Cart, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM storefront.cart_line WHERE cart_id = $1")
            .bind(cart.id)
            .execute(&mut *tx)
            .await?;

        if !cart.lines.is_empty() {
            let ids: Vec<Uuid> = cart.lines.iter().map(|l| l.id.as_uuid()).collect();
            let products: Vec<Uuid> = cart.lines.iter().map(|l| l.product_id.as_uuid()).collect();
            let quantities: Vec<i32> = cart
                .lines
                .iter()
                .map(|l| i32::try_from(l.quantity).unwrap_or(i32::MAX))
                .collect();

            sqlx::query(
                r"
                INSERT INTO storefront.cart_line (id, cart_id, product_id, quantity, position)
                SELECT line.id, $1, line.product_id, line.quantity, line.position::int
                FROM UNNEST($2::uuid[], $3::uuid[], $4::int[])
                     WITH ORDINALITY AS line (id, product_id, quantity, position)
                ",
            )
            .bind(cart.id)
            .bind(&ids)
            .bind(&products)
            .bind(&quantities)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, "cart already contains this product"))?;
        }

        let updated_at: DateTime<Utc> = sqlx::query_scalar(
            "UPDATE storefront.cart SET updated_at = now() WHERE id = $1 RETURNING updated_at",
        )
        .bind(cart.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;

        Ok(Cart {
            updated_at,
            ..cart.clone()
        })
    }
}
