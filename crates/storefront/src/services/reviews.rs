//! Review submission, moderation and listing.
//!
//! Creation is gated on a completed purchase of the product. Every write to
//! the review store is followed by a synchronous rating recompute for the
//! affected product.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use sillage_core::{ProductId, Rating, RatingDistribution, RatingSummary, ReviewId, UserId};

use super::eligibility::{EligibilityChecker, ReviewEligibility};
use super::profanity::{ProfanityFilter, filter_or_pass_through};
use super::rating::RatingAggregator;
use crate::db::{RepositoryError, Stores};
use crate::error::{AppError, Result};
use crate::models::{NewReview, Review, ReviewSort};

/// Default and maximum page size for the admin review listing.
pub const RECENT_REVIEWS_LIMIT: u32 = 100;
const RECENT_REVIEWS_MAX: u32 = 500;

/// A review as submitted by a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmission {
    pub product_id: Option<String>,
    pub user_id: Option<String>,
    #[serde(alias = "userName")]
    pub name: Option<String>,
    pub rating: Option<i64>,
    pub title: Option<String>,
    pub comment: Option<String>,
}

/// Changes to an existing review. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEdit {
    pub user_id: Option<String>,
    pub rating: Option<i64>,
    pub title: Option<String>,
    pub comment: Option<String>,
}

/// Who is asking to delete a review.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDeletion {
    pub user_id: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

/// A stored review plus whether the text filter ran over it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWrite {
    pub review: Review,
    pub text_filtered: bool,
}

/// Aggregate statistics for a product's reviews.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub average_rating: Decimal,
    pub total_reviews: u32,
    pub rating_distribution: RatingDistribution,
}

struct ValidSubmission {
    product_id: ProductId,
    user_id: UserId,
    name: String,
    rating: Rating,
    title: String,
    comment: String,
}

fn required(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_rating(value: i64) -> Result<Rating> {
    Rating::new(value).map_err(|e| AppError::validation(e.to_string()))
}

fn parse_user(raw: Option<&str>) -> Result<UserId> {
    let raw = required(raw).ok_or_else(|| AppError::validation("userId is required"))?;
    UserId::parse(raw).map_err(|e| AppError::validation(e.to_string()))
}

impl ReviewSubmission {
    fn validate(&self) -> Result<ValidSubmission> {
        let (
            Some(product_id),
            Some(user_id),
            Some(name),
            Some(rating),
            Some(title),
            Some(comment),
        ) = (
            required(self.product_id.as_deref()),
            required(self.user_id.as_deref()),
            required(self.name.as_deref()),
            self.rating,
            required(self.title.as_deref()),
            required(self.comment.as_deref()),
        )
        else {
            return Err(AppError::validation("All fields are required"));
        };

        Ok(ValidSubmission {
            product_id: product_id
                .parse()
                .map_err(|_| AppError::validation("productId is not a valid id"))?,
            user_id: UserId::parse(user_id).map_err(|e| AppError::validation(e.to_string()))?,
            name: name.to_owned(),
            rating: parse_rating(rating)?,
            title: title.to_owned(),
            comment: comment.to_owned(),
        })
    }
}

/// Review operations over the shared stores.
pub struct ReviewService<'a> {
    stores: &'a Stores,
    filter: &'a ProfanityFilter,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(stores: &'a Stores, filter: &'a ProfanityFilter) -> Self {
        Self { stores, filter }
    }

    fn eligibility(&self) -> EligibilityChecker<'a> {
        EligibilityChecker::new(
            self.stores.transactions.as_ref(),
            self.stores.reviews.as_ref(),
        )
    }

    fn aggregator(&self) -> RatingAggregator<'a> {
        RatingAggregator::new(self.stores.reviews.as_ref(), self.stores.products.as_ref())
    }

    /// Submit a review.
    ///
    /// Checks run in order and the first failure wins: field validation,
    /// the one-review rule, purchase eligibility, then product existence.
    /// An existing review is a conflict even if the purchase that allowed it
    /// has since been cancelled.
    ///
    /// # Errors
    ///
    /// Returns `Validation`, `Forbidden`, `NotFound` or `Conflict` per the
    /// failed check, or `Database` if a store fails.
    #[instrument(skip(self, submission))]
    pub async fn create(&self, submission: ReviewSubmission) -> Result<ReviewWrite> {
        let valid = submission.validate()?;

        if self
            .stores
            .reviews
            .find_by_author(valid.product_id, &valid.user_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "You have already reviewed this product".to_string(),
            ));
        }

        if !self
            .eligibility()
            .can_review(&valid.user_id, valid.product_id)
            .await
        {
            return Err(AppError::Forbidden(
                "Purchase required: you can only review products you have bought".to_string(),
            ));
        }

        if self.stores.products.get(valid.product_id).await?.is_none() {
            return Err(AppError::not_found("Product not found"));
        }

        let (title, title_filtered) = filter_or_pass_through(self.filter, &valid.title);
        let (comment, comment_filtered) = filter_or_pass_through(self.filter, &valid.comment);

        let review = self
            .stores
            .reviews
            .insert(NewReview {
                product_id: valid.product_id,
                user_id: valid.user_id,
                name: valid.name,
                rating: valid.rating,
                title,
                comment,
                verified_purchase: true,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AppError::not_found("Product not found"),
                other => other.into(),
            })?;

        tracing::info!(review_id = %review.id, product_id = %review.product_id, "Review created");
        self.aggregator().recompute(review.product_id).await;

        Ok(ReviewWrite {
            review,
            text_filtered: title_filtered && comment_filtered,
        })
    }

    /// Edit a review. Only the author may edit; there is no admin override.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Forbidden` or `Validation`.
    #[instrument(skip(self, edit), fields(review_id = %review_id))]
    pub async fn update(&self, review_id: ReviewId, edit: ReviewEdit) -> Result<ReviewWrite> {
        let mut review = self
            .stores
            .reviews
            .get(review_id)
            .await?
            .ok_or_else(|| AppError::not_found("Review not found"))?;

        let requester = parse_user(edit.user_id.as_deref())?;
        if review.user_id != requester {
            return Err(AppError::Forbidden(
                "You can only update your own reviews".to_string(),
            ));
        }

        if let Some(rating) = edit.rating {
            review.rating = parse_rating(rating)?;
        }

        let mut filter_ran = Vec::new();
        for (field, value, target) in [
            ("title", edit.title.as_deref(), &mut review.title),
            ("comment", edit.comment.as_deref(), &mut review.comment),
        ] {
            let Some(value) = value else { continue };
            let value = required(Some(value))
                .ok_or_else(|| AppError::validation(format!("{field} cannot be empty")))?;
            let (text, filtered) = filter_or_pass_through(self.filter, value);
            *target = text;
            filter_ran.push(filtered);
        }

        review.updated_at = Utc::now();
        let review = self.stores.reviews.update(&review).await?;
        self.aggregator().recompute(review.product_id).await;

        Ok(ReviewWrite {
            review,
            text_filtered: !filter_ran.is_empty() && filter_ran.iter().all(|ran| *ran),
        })
    }

    /// Delete a review. The author or an admin may delete.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Forbidden`.
    #[instrument(skip(self, deletion), fields(review_id = %review_id, is_admin = deletion.is_admin))]
    pub async fn delete(&self, review_id: ReviewId, deletion: ReviewDeletion) -> Result<Review> {
        let review = self
            .stores
            .reviews
            .get(review_id)
            .await?
            .ok_or_else(|| AppError::not_found("Review not found"))?;

        let is_owner = required(deletion.user_id.as_deref())
            .and_then(|raw| UserId::parse(raw).ok())
            .is_some_and(|user| user == review.user_id);
        if !deletion.is_admin && !is_owner {
            return Err(AppError::Forbidden("Permission denied".to_string()));
        }

        let deleted = self
            .stores
            .reviews
            .delete(review_id)
            .await?
            .ok_or_else(|| AppError::not_found("Review not found"))?;

        tracing::info!(product_id = %deleted.product_id, "Review deleted");
        self.aggregator().recompute(deleted.product_id).await;
        Ok(deleted)
    }

    /// Reviews of a product, sorted and optionally filtered to one star value.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a star filter outside 1..=5.
    pub async fn list(
        &self,
        product_id: ProductId,
        sort: ReviewSort,
        filter_rating: Option<i64>,
    ) -> Result<Vec<Review>> {
        let filter_rating = filter_rating.map(parse_rating).transpose()?;

        let mut reviews = self.stores.reviews.list_for_product(product_id).await?;
        if let Some(rating) = filter_rating {
            reviews.retain(|r| r.rating == rating);
        }
        sort.apply(&mut reviews);
        Ok(reviews)
    }

    /// Most recent reviews across the catalog, for moderation.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the store fails.
    pub async fn list_recent(&self, limit: Option<u32>) -> Result<Vec<Review>> {
        let limit = limit
            .unwrap_or(RECENT_REVIEWS_LIMIT)
            .clamp(1, RECENT_REVIEWS_MAX);
        Ok(self.stores.reviews.list_recent(limit).await?)
    }

    /// Average, count and per-star distribution of a product's reviews.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the store fails.
    pub async fn stats(&self, product_id: ProductId) -> Result<ReviewStats> {
        let ratings = self.stores.reviews.ratings_for_product(product_id).await?;
        let summary = RatingSummary::from_ratings(ratings.iter().copied());

        Ok(ReviewStats {
            average_rating: summary.average_rating,
            total_reviews: summary.review_count,
            rating_distribution: RatingDistribution::from_ratings(ratings),
        })
    }

    /// Eligibility view for the product page.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the review lookup fails.
    pub async fn check(&self, product_id: ProductId, user_id: &UserId) -> Result<ReviewEligibility> {
        Ok(self
            .eligibility()
            .review_eligibility(user_id, product_id)
            .await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use sillage_core::{Email, TransactionId, TransactionStatus};

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::product::tests::sample_details;
    use crate::models::{NewTransaction, OrderLineSnapshot, OrderTotals, Product};
    use crate::services::profanity::WordFilter;

    struct Fixture {
        memory: Arc<MemoryStore>,
        stores: Stores,
        product: Product,
    }

    impl Fixture {
        async fn new() -> Self {
            let memory = Arc::new(MemoryStore::new());
            let stores = Stores::in_memory(memory.clone());
            let product = stores
                .products
                .insert(&sample_details("Bois Sacre", "60"))
                .await
                .unwrap();
            Self {
                memory,
                stores,
                product,
            }
        }

        async fn purchase(&self, user: &str, status: TransactionStatus) -> TransactionId {
            let tx = self
                .stores
                .transactions
                .insert(NewTransaction {
                    user_id: UserId::parse(user).unwrap(),
                    email: Email::parse("buyer@example.com").unwrap(),
                    items: vec![OrderLineSnapshot::freeze(&self.product, 1)],
                    totals: OrderTotals {
                        subtotal: self.product.details.price,
                        tax: Decimal::ZERO,
                        shipping: Decimal::ZERO,
                        total: self.product.details.price,
                    },
                })
                .await
                .unwrap();
            self.stores
                .transactions
                .set_status(tx.id, status, status.is_completed().then(Utc::now))
                .await
                .unwrap();
            tx.id
        }

        fn submission(&self, user: &str, rating: i64) -> ReviewSubmission {
            ReviewSubmission {
                product_id: Some(self.product.id.to_string()),
                user_id: Some(user.to_string()),
                name: Some("Camille".to_string()),
                rating: Some(rating),
                title: Some("Gorgeous".to_string()),
                comment: Some("Smoky and warm".to_string()),
            }
        }

        async fn rating(&self) -> RatingSummary {
            self.stores
                .products
                .get(self.product.id)
                .await
                .unwrap()
                .unwrap()
                .rating
        }
    }

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_create_requires_completed_purchase() {
        let fx = Fixture::new().await;
        fx.purchase("u1", TransactionStatus::Pending).await;
        let service = ReviewService::new(&fx.stores, &ProfanityFilter::Unconfigured);

        let err = service.create(fx.submission("u1", 5)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_validation_runs_before_eligibility() {
        let fx = Fixture::new().await;
        let service = ReviewService::new(&fx.stores, &ProfanityFilter::Unconfigured);

        let mut submission = fx.submission("u1", 5);
        submission.comment = Some("   ".to_string());
        let err = service.create(submission).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = service.create(fx.submission("u1", 6)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_eligibility_fails_closed_when_ledger_is_down() {
        let fx = Fixture::new().await;
        fx.purchase("u1", TransactionStatus::Completed).await;
        fx.memory.set_fail_transaction_reads(true);
        let service = ReviewService::new(&fx.stores, &ProfanityFilter::Unconfigured);

        let err = service.create(fx.submission("u1", 5)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_create_updates_rating_and_forces_verified() {
        let fx = Fixture::new().await;
        fx.purchase("u1", TransactionStatus::Completed).await;
        fx.purchase("u2", TransactionStatus::Completed).await;
        let service = ReviewService::new(&fx.stores, &ProfanityFilter::Unconfigured);

        let written = service.create(fx.submission("u1", 5)).await.unwrap();
        service.create(fx.submission("u2", 4)).await.unwrap();

        assert!(written.review.verified_purchase);
        assert!(!written.text_filtered);
        assert_eq!(
            fx.rating().await,
            RatingSummary {
                average_rating: d("4.5"),
                review_count: 2
            }
        );
    }

    #[tokio::test]
    async fn test_second_review_conflicts() {
        let fx = Fixture::new().await;
        fx.purchase("u1", TransactionStatus::Completed).await;
        let service = ReviewService::new(&fx.stores, &ProfanityFilter::Unconfigured);

        service.create(fx.submission("u1", 5)).await.unwrap();
        let err = service.create(fx.submission("u1", 1)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_second_review_conflicts_after_cancellation() {
        let fx = Fixture::new().await;
        let order = fx.purchase("u1", TransactionStatus::Completed).await;
        let service = ReviewService::new(&fx.stores, &ProfanityFilter::Unconfigured);
        service.create(fx.submission("u1", 5)).await.unwrap();

        fx.stores
            .transactions
            .set_status(order, TransactionStatus::Cancelled, None)
            .await
            .unwrap();

        let err = service.create(fx.submission("u1", 1)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        let err = service.create(fx.submission("u2", 1)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_filter_masks_text() {
        let fx = Fixture::new().await;
        fx.purchase("u1", TransactionStatus::Completed).await;
        let filter = ProfanityFilter::Enabled(WordFilter::new(["smoky"]).unwrap());
        let service = ReviewService::new(&fx.stores, &filter);

        let written = service.create(fx.submission("u1", 5)).await.unwrap();
        assert!(written.text_filtered);
        assert_eq!(written.review.comment, "***** and warm");
    }

    #[tokio::test]
    async fn test_update_is_owner_only() {
        let fx = Fixture::new().await;
        fx.purchase("u1", TransactionStatus::Completed).await;
        let service = ReviewService::new(&fx.stores, &ProfanityFilter::Unconfigured);
        let review = service.create(fx.submission("u1", 5)).await.unwrap().review;

        let err = service
            .update(
                review.id,
                ReviewEdit {
                    user_id: Some("u2".to_string()),
                    rating: Some(1),
                    ..ReviewEdit::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let updated = service
            .update(
                review.id,
                ReviewEdit {
                    user_id: Some("u1".to_string()),
                    rating: Some(2),
                    ..ReviewEdit::default()
                },
            )
            .await
            .unwrap()
            .review;
        assert_eq!(updated.rating.value(), 2);
        assert_eq!(updated.title, "Gorgeous");
        assert!(updated.updated_at >= review.updated_at);
        assert_eq!(fx.rating().await.average_rating, d("2"));
    }

    #[tokio::test]
    async fn test_delete_last_review_resets_rating() {
        let fx = Fixture::new().await;
        fx.purchase("u1", TransactionStatus::Completed).await;
        let service = ReviewService::new(&fx.stores, &ProfanityFilter::Unconfigured);
        let review = service.create(fx.submission("u1", 3)).await.unwrap().review;

        let err = service
            .delete(
                review.id,
                ReviewDeletion {
                    user_id: Some("u9".to_string()),
                    is_admin: false,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        service
            .delete(
                review.id,
                ReviewDeletion {
                    user_id: None,
                    is_admin: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(fx.rating().await, RatingSummary::EMPTY);
    }

    #[tokio::test]
    async fn test_stats_and_check() {
        let fx = Fixture::new().await;
        fx.purchase("u1", TransactionStatus::Completed).await;
        let service = ReviewService::new(&fx.stores, &ProfanityFilter::Unconfigured);

        let before = service
            .check(fx.product.id, &UserId::parse("u1").unwrap())
            .await
            .unwrap();
        assert!(before.can_review);
        assert!(!before.has_reviewed);

        service.create(fx.submission("u1", 4)).await.unwrap();

        let after = service
            .check(fx.product.id, &UserId::parse("u1").unwrap())
            .await
            .unwrap();
        assert!(after.has_reviewed);
        assert!(after.has_completed_purchase);
        assert!(!after.can_review);

        let stats = service.stats(fx.product.id).await.unwrap();
        assert_eq!(stats.total_reviews, 1);
        assert_eq!(stats.average_rating, d("4"));
        assert_eq!(stats.rating_distribution.count(Rating::new(4).unwrap()), 1);
    }
}
