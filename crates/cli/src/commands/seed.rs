//! Seed the catalog with demo products.
//!
//! The file is a YAML list of products:
//!
//! ```yaml
//! - name: Vetiver Noir
//!   collection: Nocturne
//!   category: Eau de Parfum
//!   price: "89.00"
//!   notes: vetiver, smoke, black pepper
//!   stock: 25
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use sillage_storefront::db::{self, Stores};
use sillage_storefront::models::ProductDetails;
use sillage_storefront::models::product::DEFAULT_VOLUME;

use super::database_url;

/// A product entry in the seed file.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub collection: String,
    #[serde(default)]
    pub category: String,
    pub price: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    pub volume: Option<String>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub images: Vec<String>,
}

impl From<SeedProduct> for ProductDetails {
    fn from(seed: SeedProduct) -> Self {
        Self {
            name: seed.name,
            collection: seed.collection,
            category: seed.category,
            price: seed.price,
            description: seed.description,
            notes: seed.notes,
            volume: seed.volume.unwrap_or_else(|| DEFAULT_VOLUME.to_owned()),
            stock: seed.stock,
            images: seed.images,
        }
    }
}

/// Insert every product from a YAML file.
///
/// # Arguments
///
/// * `file_path` - Path to the YAML file
/// * `clear_existing` - If true, delete every existing product first (reviews
///   and cart lines go with them)
///
/// # Errors
///
/// Returns an error if the database URL is missing, the file cannot be read
/// or parsed, or a database operation fails.
pub async fn products(
    file_path: &str,
    clear_existing: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let database_url = database_url()?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");
    let content = tokio::fs::read_to_string(path).await?;
    let seeds: Vec<SeedProduct> = serde_yaml::from_str(&content)?;

    if let Some(bad) = seeds
        .iter()
        .find(|s| s.name.trim().is_empty() || s.price.is_sign_negative())
    {
        return Err(format!("Invalid product entry: {bad:?}").into());
    }
    info!(products = seeds.len(), "Parsed seed file");

    let pool = db::create_pool(&database_url).await?;
    let stores = Stores::postgres(&pool);
    info!("Connected to database");

    if clear_existing {
        let existing = stores.products.list(None).await?;
        for product in &existing {
            stores.products.delete(product.id).await?;
        }
        info!(deleted = existing.len(), "Cleared existing products");
    }

    let mut inserted = 0_usize;
    for seed in seeds {
        let product = stores.products.insert(&seed.into()).await?;
        info!(product_id = %product.id, name = %product.details.name, "Inserted product");
        inserted += 1;
    }

    info!(inserted, "Seeding complete");
    Ok(())
}
