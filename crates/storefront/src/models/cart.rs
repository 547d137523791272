//! Shopping cart domain types.
//!
//! A cart holds live references to catalog products. Prices are not stored
//! here; totals are recomputed from the catalog on every read.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use sillage_core::{CartId, CartLineId, ProductId, UserId};

/// Errors from cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Quantity below 1 or above [`CartLineRef::MAX_QUANTITY`].
    #[error("quantity must be between 1 and {max} (got {value})", max = CartLineRef::MAX_QUANTITY)]
    InvalidQuantity { value: i64 },

    /// The line is not in this cart.
    #[error("item not found in cart")]
    LineNotFound(CartLineId),
}

/// A cart line referencing a live catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRef {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartLineRef {
    /// Largest quantity a single line may hold.
    pub const MAX_QUANTITY: u32 = 9_999;

    /// Validate a requested quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] outside `1..=MAX_QUANTITY`.
    pub fn validate_quantity(value: i64) -> Result<u32, CartError> {
        u32::try_from(value)
            .ok()
            .filter(|q| (1..=Self::MAX_QUANTITY).contains(q))
            .ok_or(CartError::InvalidQuantity { value })
    }
}

/// A user's cart. Each user has exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    /// At most one line per product, in insertion order.
    pub lines: Vec<CartLineRef>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// An empty cart for a user.
    #[must_use]
    pub fn empty(user_id: UserId) -> Self {
        Self {
            id: CartId::generate(),
            user_id,
            lines: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Add `quantity` units of a product.
    ///
    /// Increments the existing line for the product, or appends a new one.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] if the quantity is invalid or the
    /// resulting line quantity would exceed the maximum.
    pub fn add(&mut self, product_id: ProductId, quantity: i64) -> Result<CartLineRef, CartError> {
        let quantity = CartLineRef::validate_quantity(quantity)?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            let combined = i64::from(line.quantity) + i64::from(quantity);
            line.quantity = CartLineRef::validate_quantity(combined)?;
            return Ok(*line);
        }

        let line = CartLineRef {
            id: CartLineId::generate(),
            product_id,
            quantity,
        };
        self.lines.push(line);
        Ok(line)
    }

    /// Set an existing line's quantity. Zero is rejected, not treated as removal.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] or [`CartError::LineNotFound`].
    pub fn set_quantity(&mut self, line_id: CartLineId, quantity: i64) -> Result<(), CartError> {
        let quantity = CartLineRef::validate_quantity(quantity)?;
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or(CartError::LineNotFound(line_id))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the line is not in this cart.
    pub fn remove(&mut self, line_id: CartLineId) -> Result<CartLineRef, CartError> {
        let index = self
            .lines
            .iter()
            .position(|l| l.id == line_id)
            .ok_or(CartError::LineNotFound(line_id))?;
        Ok(self.lines.remove(index))
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Product IDs referenced by the cart, in line order.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.lines.iter().map(|l| l.product_id).collect()
    }
}
