//! Catalog product domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

use sillage_core::{ProductId, RatingSummary};

/// Default bottle size when none is given.
pub const DEFAULT_VOLUME: &str = "100ml";

/// Catalog-editable fields of a product.
///
/// Rating fields are intentionally absent: they are derived from reviews and
/// can only be written by the rating aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    pub name: String,
    /// Collection tag, e.g. "Signature" or "Nocturne".
    pub collection: String,
    pub category: String,
    pub price: Decimal,
    pub description: String,
    /// Fragrance notes, e.g. "bergamot, vetiver, amber".
    pub notes: String,
    pub volume: String,
    pub stock: u32,
    /// Public image references, e.g. `/uploads/products/product-<uuid>.jpg`.
    pub images: Vec<String>,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub details: ProductDetails,
    pub rating: RatingSummary,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Whether at least one unit is in stock.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.details.stock > 0
    }

    /// The first image, used as the product thumbnail.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.details.images.first().map(String::as_str)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductJson<'a> {
    id: ProductId,
    #[serde(flatten)]
    details: &'a ProductDetails,
    in_stock: bool,
    #[serde(flatten)]
    rating: RatingSummary,
    created_at: DateTime<Utc>,
}

impl Serialize for Product {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ProductJson {
            id: self.id,
            details: &self.details,
            in_stock: self.in_stock(),
            rating: self.rating,
            created_at: self.created_at,
        }
        .serialize(serializer)
    }
}
