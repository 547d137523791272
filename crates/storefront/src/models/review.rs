//! Product review domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sillage_core::{ProductId, Rating, ReviewId, UserId};

/// A product review.
///
/// At most one review exists per (product, user) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    /// Display name shown next to the review.
    pub name: String,
    pub rating: Rating,
    pub title: String,
    pub comment: String,
    /// Set when the review was accepted after a purchase check.
    pub verified_purchase: bool,
    pub helpful_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for inserting a review.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub name: String,
    pub rating: Rating,
    pub title: String,
    pub comment: String,
    pub verified_purchase: bool,
}

/// Ordering for a product's review list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewSort {
    #[default]
    Newest,
    Oldest,
    Highest,
    Lowest,
    Helpful,
}

impl ReviewSort {
    /// Sort reviews in place. Ties fall back to newest first.
    pub fn apply(self, reviews: &mut [Review]) {
        reviews.sort_by(|a, b| {
            let newest_first = b.created_at.cmp(&a.created_at);
            match self {
                Self::Newest => newest_first,
                Self::Oldest => a.created_at.cmp(&b.created_at),
                Self::Highest => b.rating.cmp(&a.rating).then(newest_first),
                Self::Lowest => a.rating.cmp(&b.rating).then(newest_first),
                Self::Helpful => b.helpful_count.cmp(&a.helpful_count).then(newest_first),
            }
        });
    }
}
