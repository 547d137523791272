//! Cart route handlers. Every response is the full priced cart view.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use sillage_core::{CartLineId, UserId};

use super::extract::JsonBody;
use super::parse_id;
use crate::error::{AppError, Result};
use crate::services::cart::{AddToCart, CartView};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QuantityBody {
    pub quantity: Option<i64>,
}

/// A cart view with a short description of what changed.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(flatten)]
    pub cart: CartView,
}

impl CartResponse {
    fn with_message(message: &'static str, cart: CartView) -> Json<Self> {
        Json(Self {
            message: Some(message),
            cart,
        })
    }
}

fn user_id(raw: &str) -> Result<UserId> {
    UserId::parse(raw).map_err(|e| AppError::validation(e.to_string()))
}

fn line_id(raw: &str) -> Result<CartLineId> {
    parse_id(raw, "item not found in cart")
}

/// GET /api/cart/{user}
pub async fn show(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<CartResponse>> {
    let cart = state.cart().get(&user_id(&user)?).await?;
    Ok(Json(CartResponse {
        message: None,
        cart,
    }))
}

/// POST /api/cart/{user}
pub async fn add(
    State(state): State<AppState>,
    Path(user): Path<String>,
    JsonBody(request): JsonBody<AddToCart>,
) -> Result<Json<CartResponse>> {
    let cart = state.cart().add(&user_id(&user)?, request).await?;
    Ok(CartResponse::with_message("Item added to cart", cart))
}

/// PATCH /api/cart/{user}/item/{line}
pub async fn set_quantity(
    State(state): State<AppState>,
    Path((user, line)): Path<(String, String)>,
    JsonBody(body): JsonBody<QuantityBody>,
) -> Result<Json<CartResponse>> {
    let user = user_id(&user)?;
    let line = line_id(&line)?;
    let cart = state.cart().set_quantity(&user, line, body.quantity).await?;
    Ok(CartResponse::with_message("Quantity updated", cart))
}

/// DELETE /api/cart/{user}/item/{line}
pub async fn remove(
    State(state): State<AppState>,
    Path((user, line)): Path<(String, String)>,
) -> Result<Json<CartResponse>> {
    let user = user_id(&user)?;
    let line = line_id(&line)?;
    let cart = state.cart().remove(&user, line).await?;
    Ok(CartResponse::with_message("Item removed from cart", cart))
}

/// DELETE /api/cart/{user}
pub async fn clear(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<CartResponse>> {
    let cart = state.cart().clear(&user_id(&user)?).await?;
    Ok(CartResponse::with_message("Cart cleared", cart))
}
