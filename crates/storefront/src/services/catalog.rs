//! Catalog management: products and their images.

use rust_decimal::Decimal;
use tracing::instrument;

use sillage_core::{ProductId, round_money};

use super::images::{ImageStorage, ImageUpload, MAX_IMAGES, validate};
use crate::db::Stores;
use crate::error::{AppError, Result};
use crate::models::product::DEFAULT_VOLUME;
use crate::models::{Product, ProductDetails};

/// Text fields of a product create or update form, as submitted.
///
/// Every field is optional so the same form serves partial updates.
/// `existing_images` lists the current image references the client keeps;
/// on update, images missing from it are deleted.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub collection: Option<String>,
    pub category: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub volume: Option<String>,
    pub stock: Option<String>,
    pub existing_images: Option<Vec<String>>,
}

fn parse_price(raw: &str) -> Result<Decimal> {
    let price: Decimal = raw
        .trim()
        .parse()
        .map_err(|_| AppError::validation("price must be a number"))?;
    if price.is_sign_negative() {
        return Err(AppError::validation("price cannot be negative"));
    }
    Ok(round_money(price))
}

fn parse_stock(raw: &str) -> Result<u32> {
    let stock: i64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::validation("stock must be a whole number"))?;
    if stock < 0 {
        return Err(AppError::validation("stock cannot be negative"));
    }
    u32::try_from(stock)
        .ok()
        .filter(|s| i32::try_from(*s).is_ok())
        .ok_or_else(|| AppError::validation("stock is too large"))
}

fn text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned())
}

impl ProductForm {
    fn into_new_details(self) -> Result<ProductDetails> {
        let name = text(self.name)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::validation("name is required"))?;
        let price = self
            .price
            .as_deref()
            .ok_or_else(|| AppError::validation("price is required"))
            .and_then(parse_price)?;
        let stock = self.stock.as_deref().map(parse_stock).transpose()?;

        Ok(ProductDetails {
            name,
            collection: text(self.collection).unwrap_or_default(),
            category: text(self.category).unwrap_or_default(),
            price,
            description: text(self.description).unwrap_or_default(),
            notes: text(self.notes).unwrap_or_default(),
            volume: text(self.volume)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_VOLUME.to_owned()),
            stock: stock.unwrap_or(0),
            images: Vec::new(),
        })
    }

    /// Apply provided fields over `details`. Images are handled by the caller.
    fn apply_to(self, details: &mut ProductDetails) -> Result<()> {
        if let Some(name) = text(self.name) {
            if name.is_empty() {
                return Err(AppError::validation("name cannot be empty"));
            }
            details.name = name;
        }
        if let Some(price) = self.price.as_deref() {
            details.price = parse_price(price)?;
        }
        if let Some(stock) = self.stock.as_deref() {
            details.stock = parse_stock(stock)?;
        }
        if let Some(collection) = text(self.collection) {
            details.collection = collection;
        }
        if let Some(category) = text(self.category) {
            details.category = category;
        }
        if let Some(description) = text(self.description) {
            details.description = description;
        }
        if let Some(notes) = text(self.notes) {
            details.notes = notes;
        }
        if let Some(volume) = text(self.volume).filter(|v| !v.is_empty()) {
            details.volume = volume;
        }
        Ok(())
    }
}

pub struct CatalogService<'a> {
    stores: &'a Stores,
    images: &'a ImageStorage,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(stores: &'a Stores, images: &'a ImageStorage) -> Self {
        Self { stores, images }
    }

    /// # Errors
    ///
    /// Returns `Database` if the store fails.
    pub async fn list(&self) -> Result<Vec<Product>> {
        Ok(self.stores.products.list(None).await?)
    }

    /// # Errors
    ///
    /// Returns `Database` if the store fails.
    pub async fn list_by_collection(&self, collection: &str) -> Result<Vec<Product>> {
        Ok(self.stores.products.list(Some(collection)).await?)
    }

    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    pub async fn get(&self, id: ProductId) -> Result<Product> {
        self.stores
            .products
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("Product not found"))
    }

    /// Create a product, storing its images first.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for bad fields or images.
    #[instrument(skip(self, form, uploads), fields(images = uploads.len()))]
    pub async fn create(&self, form: ProductForm, uploads: &[ImageUpload]) -> Result<Product> {
        let mut details = form.into_new_details()?;
        details.images = self.images.store_all(uploads).await?;

        match self.stores.products.insert(&details).await {
            Ok(product) => {
                tracing::info!(product_id = %product.id, name = %product.details.name, "Product created");
                Ok(product)
            }
            Err(e) => {
                self.images.remove_all(&details.images).await;
                Err(e.into())
            }
        }
    }

    /// Partially update a product.
    ///
    /// The new image list is the kept subset of the current images followed
    /// by the new uploads. Images no longer referenced are deleted from disk
    /// once the update is stored.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Validation`.
    #[instrument(skip(self, form, uploads), fields(product_id = %id, images = uploads.len()))]
    pub async fn update(
        &self,
        id: ProductId,
        mut form: ProductForm,
        uploads: &[ImageUpload],
    ) -> Result<Product> {
        let current = self.get(id).await?;
        let mut details = current.details.clone();

        let keep = form.existing_images.take().unwrap_or_default();
        let kept: Vec<String> = current
            .details
            .images
            .iter()
            .filter(|image| keep.contains(image))
            .cloned()
            .collect();
        let dropped: Vec<&String> = current
            .details
            .images
            .iter()
            .filter(|image| !kept.contains(image))
            .collect();

        form.apply_to(&mut details)?;
        validate(uploads)?;
        if kept.len() + uploads.len() > MAX_IMAGES {
            return Err(AppError::validation(format!(
                "A product may have at most {MAX_IMAGES} images"
            )));
        }

        let added = self.images.store_all(uploads).await?;
        details.images = kept.iter().chain(&added).cloned().collect();

        match self.stores.products.update(id, &details).await {
            Ok(product) => {
                self.images.remove_all(&dropped).await;
                tracing::info!(removed = dropped.len(), added = added.len(), "Product updated");
                Ok(product)
            }
            Err(e) => {
                self.images.remove_all(&added).await;
                Err(e.into())
            }
        }
    }

    /// Delete a product and its image files.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product does not exist.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete(&self, id: ProductId) -> Result<Product> {
        let product = self
            .stores
            .products
            .delete(id)
            .await?
            .ok_or_else(|| AppError::not_found("Product not found"))?;
        self.images.remove_all(&product.details.images).await;
        tracing::info!("Product deleted");
        Ok(product)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::body::Bytes;
    use uuid::Uuid;

    use super::*;
    use crate::db::MemoryStore;

    struct Fixture {
        stores: Stores,
        images: ImageStorage,
        dir: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = std::env::temp_dir().join(format!("sillage-catalog-{}", Uuid::new_v4()));
            Self {
                stores: Stores::in_memory(Arc::new(MemoryStore::new())),
                images: ImageStorage::new(&dir),
                dir,
            }
        }

        fn service(&self) -> CatalogService<'_> {
            CatalogService::new(&self.stores, &self.images)
        }

        fn file_exists(&self, reference: &str) -> bool {
            let name = reference.strip_prefix("/uploads/products/").unwrap();
            self.dir.join("products").join(name).exists()
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    fn png() -> ImageUpload {
        ImageUpload {
            content_type: "image/png".to_string(),
            bytes: Bytes::from_static(b"\x89PNG"),
        }
    }

    fn form(name: &str, price: &str) -> ProductForm {
        ProductForm {
            name: Some(name.to_string()),
            price: Some(price.to_string()),
            collection: Some("Nocturne".to_string()),
            ..ProductForm::default()
        }
    }

    #[tokio::test]
    async fn test_create_applies_defaults_and_stores_images() {
        let fx = Fixture::new();
        let product = fx
            .service()
            .create(form("Santal 33", "120"), &[png()])
            .await
            .unwrap();

        assert_eq!(product.details.volume, "100ml");
        assert_eq!(product.details.stock, 0);
        assert_eq!(product.rating.review_count, 0);
        assert_eq!(product.details.images.len(), 1);
        assert!(product.details.images[0].starts_with("/uploads/products/product-"));
        assert!(product.details.images[0].ends_with(".png"));
        assert!(fx.file_exists(&product.details.images[0]));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let fx = Fixture::new();
        let service = fx.service();

        let err = service.create(form("  ", "10"), &[]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = service.create(form("Musc", "-1"), &[]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let mut negative_stock = form("Musc", "10");
        negative_stock.stock = Some("-3".to_string());
        let err = service.create(negative_stock, &[]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let pdf = ImageUpload {
            content_type: "application/pdf".to_string(),
            bytes: Bytes::from_static(b"%PDF"),
        };
        let err = service.create(form("Musc", "10"), &[pdf]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_keeps_selected_images_and_removes_the_rest() {
        let fx = Fixture::new();
        let service = fx.service();
        let product = service
            .create(form("Ambre", "80"), &[png(), png()])
            .await
            .unwrap();
        let keep = product.details.images[0].clone();
        let drop = product.details.images[1].clone();

        let update = ProductForm {
            price: Some("95".to_string()),
            existing_images: Some(vec![keep.clone()]),
            ..ProductForm::default()
        };
        let updated = service.update(product.id, update, &[png()]).await.unwrap();

        assert_eq!(updated.details.name, "Ambre");
        assert_eq!(updated.details.price, "95".parse::<Decimal>().unwrap());
        assert_eq!(updated.details.images.len(), 2);
        assert_eq!(updated.details.images[0], keep);
        assert!(fx.file_exists(&keep));
        assert!(!fx.file_exists(&drop));
    }

    #[tokio::test]
    async fn test_update_ignores_foreign_image_references() {
        let fx = Fixture::new();
        let service = fx.service();
        let product = service.create(form("Cuir", "70"), &[]).await.unwrap();

        let update = ProductForm {
            existing_images: Some(vec!["/uploads/products/elsewhere.png".to_string()]),
            ..ProductForm::default()
        };
        let updated = service.update(product.id, update, &[]).await.unwrap();
        assert!(updated.details.images.is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_images() {
        let fx = Fixture::new();
        let service = fx.service();
        let product = service.create(form("Neroli", "60"), &[png()]).await.unwrap();
        let image = product.details.images[0].clone();

        service.delete(product.id).await.unwrap();

        assert!(!fx.file_exists(&image));
        let err = service.get(product.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_by_collection() {
        let fx = Fixture::new();
        let service = fx.service();
        service.create(form("A", "10"), &[]).await.unwrap();
        let mut other = form("B", "10");
        other.collection = Some("Jardin".to_string());
        service.create(other, &[]).await.unwrap();

        let nocturne = service.list_by_collection("Nocturne").await.unwrap();
        assert_eq!(nocturne.len(), 1);
        assert_eq!(service.list().await.unwrap().len(), 2);
    }
}
