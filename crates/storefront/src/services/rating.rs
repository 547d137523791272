//! Derived product rating maintenance.

use tracing::instrument;

use sillage_core::{ProductId, RatingSummary};

use crate::db::{ProductStore, ReviewStore};

/// Recomputes a product's rating fields from its reviews.
pub struct RatingAggregator<'a> {
    reviews: &'a dyn ReviewStore,
    products: &'a dyn ProductStore,
}

impl<'a> RatingAggregator<'a> {
    #[must_use]
    pub fn new(reviews: &'a dyn ReviewStore, products: &'a dyn ProductStore) -> Self {
        Self { reviews, products }
    }

    /// Recompute the product's average rating and review count from scratch.
    ///
    /// Failures are logged and swallowed: the review write that triggered the
    /// recompute has already committed. Returns the written summary on success.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn recompute(&self, product_id: ProductId) -> Option<RatingSummary> {
        let ratings = match self.reviews.ratings_for_product(product_id).await {
            Ok(ratings) => ratings,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load ratings for aggregation");
                return None;
            }
        };

        let summary = RatingSummary::from_ratings(ratings);
        if let Err(e) = self.products.set_rating(product_id, summary).await {
            tracing::error!(error = %e, "Failed to store product rating");
            return None;
        }

        tracing::debug!(
            average = %summary.average_rating,
            count = summary.review_count,
            "Product rating recomputed"
        );
        Some(summary)
    }
}
