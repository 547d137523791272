//! Purchase-gated review eligibility.

use serde::Serialize;
use tracing::instrument;

use sillage_core::{ProductId, UserId};

use crate::db::{RepositoryError, ReviewStore, TransactionStore};
use crate::models::Review;

/// Combined eligibility view for a (user, product) pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEligibility {
    pub has_reviewed: bool,
    pub review: Option<Review>,
    /// `has_completed_purchase && !has_reviewed`.
    pub can_review: bool,
    pub has_completed_purchase: bool,
}

/// Decides whether a user may review a product.
pub struct EligibilityChecker<'a> {
    transactions: &'a dyn TransactionStore,
    reviews: &'a dyn ReviewStore,
}

impl<'a> EligibilityChecker<'a> {
    #[must_use]
    pub fn new(transactions: &'a dyn TransactionStore, reviews: &'a dyn ReviewStore) -> Self {
        Self {
            transactions,
            reviews,
        }
    }

    /// Whether the user has a completed transaction containing the product.
    ///
    /// A failed lookup is logged and counts as "no purchase".
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn can_review(&self, user_id: &UserId, product_id: ProductId) -> bool {
        match self
            .transactions
            .has_completed_purchase(user_id, product_id)
            .await
        {
            Ok(purchased) => purchased,
            Err(e) => {
                tracing::error!(error = %e, "Purchase lookup failed, denying review eligibility");
                false
            }
        }
    }

    /// The user's existing review of the product, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the lookup fails.
    pub async fn has_reviewed(
        &self,
        user_id: &UserId,
        product_id: ProductId,
    ) -> Result<Option<Review>, RepositoryError> {
        self.reviews.find_by_author(product_id, user_id).await
    }

    /// Everything a product page needs to decide whether to show the review form.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the review lookup fails.
    pub async fn review_eligibility(
        &self,
        user_id: &UserId,
        product_id: ProductId,
    ) -> Result<ReviewEligibility, RepositoryError> {
        let review = self.has_reviewed(user_id, product_id).await?;
        let has_completed_purchase = self.can_review(user_id, product_id).await;
        let has_reviewed = review.is_some();

        Ok(ReviewEligibility {
            has_reviewed,
            review,
            can_review: has_completed_purchase && !has_reviewed,
            has_completed_purchase,
        })
    }
}
