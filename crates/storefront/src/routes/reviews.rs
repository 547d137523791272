//! Review route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use sillage_core::{ProductId, ReviewId, UserId};

use super::extract::{JsonBody, QueryParams};
use super::parse_id;
use crate::error::{AppError, Result};
use crate::models::{Review, ReviewSort};
use crate::services::eligibility::ReviewEligibility;
use crate::services::reviews::{
    ReviewDeletion, ReviewEdit, ReviewStats, ReviewSubmission, ReviewWrite,
};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(default)]
    pub sort_by: ReviewSort,
    pub filter_rating: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentParams {
    pub limit: Option<u32>,
}

fn product_id(raw: &str) -> Result<ProductId> {
    parse_id(raw, "Product not found")
}

fn review_id(raw: &str) -> Result<ReviewId> {
    parse_id(raw, "Review not found")
}

/// GET /api/reviews/all/reviews
pub async fn recent(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<RecentParams>,
) -> Result<Json<Vec<Review>>> {
    Ok(Json(state.reviews().list_recent(params.limit).await?))
}

/// GET /api/reviews/product/{id}
pub async fn for_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Vec<Review>>> {
    let id = product_id(&id)?;
    let reviews = state
        .reviews()
        .list(id, params.sort_by, params.filter_rating)
        .await?;
    Ok(Json(reviews))
}

/// GET /api/reviews/product/{id}/stats
pub async fn stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReviewStats>> {
    let id = product_id(&id)?;
    Ok(Json(state.reviews().stats(id).await?))
}

/// GET /api/reviews/product/{id}/user/{user}/check
pub async fn check(
    State(state): State<AppState>,
    Path((id, user)): Path<(String, String)>,
) -> Result<Json<ReviewEligibility>> {
    let id = product_id(&id)?;
    let user = UserId::parse(&user).map_err(|e| AppError::validation(e.to_string()))?;
    Ok(Json(state.reviews().check(id, &user).await?))
}

/// POST /api/reviews
pub async fn create(
    State(state): State<AppState>,
    JsonBody(submission): JsonBody<ReviewSubmission>,
) -> Result<(StatusCode, Json<Value>)> {
    let ReviewWrite {
        review,
        text_filtered,
    } = state.reviews().create(submission).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Review added successfully",
            "review": review,
            "textFiltered": text_filtered,
        })),
    ))
}

/// PUT /api/reviews/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(edit): JsonBody<ReviewEdit>,
) -> Result<Json<Value>> {
    let id = review_id(&id)?;
    let ReviewWrite {
        review,
        text_filtered,
    } = state.reviews().update(id, edit).await?;
    Ok(Json(json!({
        "message": "Review updated successfully",
        "review": review,
        "textFiltered": text_filtered,
    })))
}

/// DELETE /api/reviews/{id}
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(deletion): JsonBody<ReviewDeletion>,
) -> Result<Json<Value>> {
    let id = review_id(&id)?;
    state.reviews().delete(id, deletion).await?;
    Ok(Json(json!({ "message": "Review deleted successfully" })))
}
