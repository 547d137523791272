//! `PostgreSQL` catalog store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use sillage_core::{ProductId, RatingSummary};

use super::{ProductStore, RepositoryError};
use crate::models::{Product, ProductDetails};

const PRODUCT_COLUMNS: &str = "id, name, collection, category, price, description, notes, \
     volume, stock, images, average_rating, review_count, created_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    collection: String,
    category: String,
    price: Decimal,
    description: String,
    notes: String,
    volume: String,
    stock: i32,
    images: Vec<String>,
    average_rating: Decimal,
    review_count: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let stock = u32::try_from(row.stock).map_err(|_| {
            RepositoryError::DataCorruption(format!("negative stock for product {}", row.id))
        })?;
        let review_count = u32::try_from(row.review_count).map_err(|_| {
            RepositoryError::DataCorruption(format!("negative review count for product {}", row.id))
        })?;

        Ok(Self {
            id: ProductId::from_uuid(row.id),
            details: ProductDetails {
                name: row.name,
                collection: row.collection,
                category: row.category,
                price: row.price,
                description: row.description,
                notes: row.notes,
                volume: row.volume,
                stock,
                images: row.images,
            },
            rating: RatingSummary {
                average_rating: row.average_rating,
                review_count,
            },
            created_at: row.created_at,
        })
    }
}

fn stock_param(details: &ProductDetails) -> Result<i32, RepositoryError> {
    i32::try_from(details.stock)
        .map_err(|_| RepositoryError::Conflict(format!("stock {} is out of range", details.stock)))
}

/// Catalog store backed by `storefront.product`.
#[derive(Debug, Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    #[instrument(skip(self))]
    async fn list(&self, collection: Option<&str>) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM storefront.product
            WHERE $1::text IS NULL OR collection = $1
            ORDER BY created_at DESC
            "
        ))
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    #[instrument(skip(self), fields(count = ids.len()))]
    async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product WHERE id = ANY($1)"
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    #[instrument(skip(self, details), fields(name = %details.name))]
    async fn insert(&self, details: &ProductDetails) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO storefront.product
                (id, name, collection, category, price, description, notes, volume, stock, images)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(ProductId::generate())
        .bind(&details.name)
        .bind(&details.collection)
        .bind(&details.category)
        .bind(details.price)
        .bind(&details.description)
        .bind(&details.notes)
        .bind(&details.volume)
        .bind(stock_param(details)?)
        .bind(&details.images)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| super::map_write_error(e, "product already exists"))?;

        Product::try_from(row)
    }

    #[instrument(skip(self, details), fields(product_id = %id))]
    async fn update(
        &self,
        id: ProductId,
        details: &ProductDetails,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE storefront.product
            SET name = $2, collection = $3, category = $4, price = $5, description = $6,
                notes = $7, volume = $8, stock = $9, images = $10, updated_at = now()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&details.name)
        .bind(&details.collection)
        .bind(&details.category)
        .bind(details.price)
        .bind(&details.description)
        .bind(&details.notes)
        .bind(&details.volume)
        .bind(stock_param(details)?)
        .bind(&details.images)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Product::try_from(row)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn set_rating(
        &self,
        id: ProductId,
        rating: RatingSummary,
    ) -> Result<(), RepositoryError> {
        let review_count = i32::try_from(rating.review_count).unwrap_or(i32::MAX);

        let result = sqlx::query(
            r"
            UPDATE storefront.product
            SET average_rating = $2, review_count = $3
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(rating.average_rating)
        .bind(review_count)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn delete(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "DELETE FROM storefront.product WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }
}
