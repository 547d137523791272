//! Review ratings and their aggregates.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize, Serializer};

/// Error returned for a rating outside 1..=5.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rating must be between 1 and 5 (got {value})")]
pub struct RatingError {
    /// The rejected value.
    pub value: i64,
}

/// A star rating from 1 to 5 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Lowest allowed rating.
    pub const MIN: u8 = 1;
    /// Highest allowed rating.
    pub const MAX: u8 = 5;

    /// Create a rating, rejecting values outside 1..=5.
    ///
    /// # Errors
    ///
    /// Returns [`RatingError`] when the value is out of range.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError { value })
    }

    /// The numeric value of the rating.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = RatingError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Rating {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i16 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Rating {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(i64::from(raw))?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Rating {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&i16::from(self.0), buf)
    }
}

/// Derived rating fields stored on a product.
///
/// Always computed from the full set of reviews, never adjusted
/// incrementally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    /// Mean rating rounded to one decimal place, `0` when there are no reviews.
    pub average_rating: Decimal,
    /// Number of reviews.
    pub review_count: u32,
}

impl RatingSummary {
    /// Summary of a product with no reviews.
    pub const EMPTY: Self = Self {
        average_rating: Decimal::ZERO,
        review_count: 0,
    };

    /// Aggregate a complete set of ratings.
    #[must_use]
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = Rating>,
    {
        let (sum, count) = ratings
            .into_iter()
            .fold((0_u64, 0_u32), |(sum, count), rating| {
                (sum + u64::from(rating.value()), count.saturating_add(1))
            });

        if count == 0 {
            return Self::EMPTY;
        }

        let mean = Decimal::from(sum) / Decimal::from(count);
        Self {
            average_rating: mean.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero),
            review_count: count,
        }
    }
}

/// How many reviews gave each star rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RatingDistribution([u32; 5]);

impl RatingDistribution {
    /// Count a complete set of ratings.
    #[must_use]
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = Rating>,
    {
        let mut counts = [0_u32; 5];
        for rating in ratings {
            if let Some(slot) = counts.get_mut(usize::from(rating.value() - Rating::MIN)) {
                *slot += 1;
            }
        }
        Self(counts)
    }

    /// Number of reviews with the given star rating.
    #[must_use]
    pub fn count(&self, rating: Rating) -> u32 {
        self.0
            .get(usize::from(rating.value() - Rating::MIN))
            .copied()
            .unwrap_or(0)
    }

    /// Star rating to count, for every star value.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<u8, u32> {
        (Rating::MIN..=Rating::MAX).zip(self.0).collect()
    }
}

impl Serialize for RatingDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.to_map())
    }
}
