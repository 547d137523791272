//! `PostgreSQL` review store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use sillage_core::{ProductId, Rating, ReviewId, UserId};

use super::{RepositoryError, ReviewStore, map_write_error};
use crate::models::{NewReview, Review};

const REVIEW_COLUMNS: &str = "id, product_id, user_id, name, rating, title, comment, \
     verified_purchase, helpful_count, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    product_id: Uuid,
    user_id: String,
    name: String,
    rating: i16,
    title: String,
    comment: String,
    verified_purchase: bool,
    helpful_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let corrupt = |what: String| RepositoryError::DataCorruption(format!("review {}: {what}", row.id));

        let user_id = UserId::parse(&row.user_id).map_err(|e| corrupt(e.to_string()))?;
        let rating = Rating::new(i64::from(row.rating)).map_err(|e| corrupt(e.to_string()))?;
        let helpful_count =
            u32::try_from(row.helpful_count).map_err(|_| corrupt("negative helpful count".into()))?;

        Ok(Self {
            id: ReviewId::from_uuid(row.id),
            product_id: ProductId::from_uuid(row.product_id),
            user_id,
            name: row.name,
            rating,
            title: row.title,
            comment: row.comment,
            verified_purchase: row.verified_purchase,
            helpful_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_reviews(rows: Vec<ReviewRow>) -> Result<Vec<Review>, RepositoryError> {
    rows.into_iter().map(Review::try_from).collect()
}

/// Review store backed by `storefront.review`.
///
/// The `review_one_per_user` unique constraint is the source of truth for
/// duplicate detection.
#[derive(Debug, Clone)]
pub struct PgReviewStore {
    pool: PgPool,
}

impl PgReviewStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewStore for PgReviewStore {
    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            r"
            SELECT {REVIEW_COLUMNS}
            FROM storefront.review
            WHERE product_id = $1
            ORDER BY created_at DESC
            "
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        into_reviews(rows)
    }

    #[instrument(skip(self))]
    async fn list_recent(&self, limit: u32) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM storefront.review ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        into_reviews(rows)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn ratings_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Rating>, RepositoryError> {
        let rows = sqlx::query_scalar::<_, Rating>(
            "SELECT rating FROM storefront.review WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[instrument(skip(self), fields(review_id = %id))]
    async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM storefront.review WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Review::try_from).transpose()
    }

    #[instrument(skip(self), fields(product_id = %product_id, user_id = %user_id))]
    async fn find_by_author(
        &self,
        product_id: ProductId,
        user_id: &UserId,
    ) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM storefront.review WHERE product_id = $1 AND user_id = $2"
        ))
        .bind(product_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Review::try_from).transpose()
    }

    #[instrument(skip(self, review), fields(product_id = %review.product_id, user_id = %review.user_id))]
    async fn insert(&self, review: NewReview) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r"
            INSERT INTO storefront.review
                (id, product_id, user_id, name, rating, title, comment, verified_purchase)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {REVIEW_COLUMNS}
            "
        ))
        .bind(ReviewId::generate())
        .bind(review.product_id)
        .bind(&review.user_id)
        .bind(&review.name)
        .bind(review.rating)
        .bind(&review.title)
        .bind(&review.comment)
        .bind(review.verified_purchase)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "you have already reviewed this product"))?;

        Review::try_from(row)
    }

    #[instrument(skip(self, review), fields(review_id = %review.id))]
    async fn update(&self, review: &Review) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r"
            UPDATE storefront.review
            SET rating = $2, title = $3, comment = $4, updated_at = $5
            WHERE id = $1
            RETURNING {REVIEW_COLUMNS}
            "
        ))
        .bind(review.id)
        .bind(review.rating)
        .bind(&review.title)
        .bind(&review.comment)
        .bind(review.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Review::try_from(row)
    }

    #[instrument(skip(self), fields(review_id = %id))]
    async fn delete(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            "DELETE FROM storefront.review WHERE id = $1 RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Review::try_from).transpose()
    }
}
