//! Catalog route handlers.
//!
//! Create and update take `multipart/form-data`: text fields by name, image
//! files under `images`, and the kept images as a JSON array string in
//! `existingImages`.

use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    http::StatusCode,
};
use serde_json::{Value, json};
use tracing::instrument;

use super::parse_id;
use crate::error::{AppError, Result};
use crate::models::Product;
use crate::services::catalog::ProductForm;
use crate::services::images::ImageUpload;
use crate::state::AppState;

fn multipart_error(err: impl std::fmt::Display) -> AppError {
    AppError::validation(format!("invalid multipart body: {err}"))
}

/// Split a multipart body into the text form and the image uploads.
async fn read_form(mut multipart: Multipart) -> Result<(ProductForm, Vec<ImageUpload>)> {
    let mut form = ProductForm::default();
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_owned();

        if name == "images" {
            let content_type = field.content_type().unwrap_or_default().to_owned();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            uploads.push(ImageUpload {
                content_type,
                bytes,
            });
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            "name" => form.name = Some(value),
            "collection" => form.collection = Some(value),
            "category" => form.category = Some(value),
            "price" => form.price = Some(value),
            "description" => form.description = Some(value),
            "notes" => form.notes = Some(value),
            "volume" => form.volume = Some(value),
            "stock" => form.stock = Some(value),
            "existingImages" => {
                let kept: Vec<String> = serde_json::from_str(&value).map_err(|_| {
                    AppError::validation("existingImages must be a JSON array of strings")
                })?;
                form.existing_images = Some(kept);
            }
            other => tracing::debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    Ok((form, uploads))
}

/// GET /api/products
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog().list().await?))
}

/// GET /api/products/{id}
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Product>> {
    let id = parse_id(&id, "Product not found")?;
    Ok(Json(state.catalog().get(id).await?))
}

/// GET /api/products/collection/{name}
pub async fn by_collection(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.catalog().list_by_collection(&collection).await?))
}

/// POST /api/products
#[instrument(skip(state, multipart))]
pub async fn create(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Product>)> {
    let (form, uploads) = read_form(multipart?).await?;
    let product = state.catalog().create(form, &uploads).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/products/{id}
#[instrument(skip(state, multipart))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<Product>> {
    let id = parse_id(&id, "Product not found")?;
    let (form, uploads) = read_form(multipart?).await?;
    Ok(Json(state.catalog().update(id, form, &uploads).await?))
}

/// DELETE /api/products/{id}
pub async fn destroy(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let id = parse_id(&id, "Product not found")?;
    state.catalog().delete(id).await?;
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}
