//! Cart mutations and the priced cart view.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use sillage_core::{CartId, CartLineId, CartTotals, ProductId, UserId};

use crate::db::Stores;
use crate::error::{AppError, Result};
use crate::models::{Cart, Product};

fn default_quantity() -> i64 {
    1
}

/// Body of an add-to-cart request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

/// A cart line joined to live product data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub collection: String,
    pub line_total: Decimal,
}

/// The cart as clients see it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartItemView>,
    pub totals: CartTotals,
    pub updated_at: DateTime<Utc>,
}

impl CartView {
    /// Join cart lines to products. Lines whose product is gone are left out
    /// of both the items and the totals.
    fn build(cart: Cart, products: &[Product]) -> Self {
        let items: Vec<CartItemView> = cart
            .lines
            .iter()
            .filter_map(|line| {
                let product = products.iter().find(|p| p.id == line.product_id)?;
                Some(CartItemView {
                    id: line.id,
                    product_id: line.product_id,
                    quantity: line.quantity,
                    name: product.details.name.clone(),
                    price: product.details.price,
                    image: product.primary_image().map(str::to_owned),
                    collection: product.details.collection.clone(),
                    line_total: product.details.price * Decimal::from(line.quantity),
                })
            })
            .collect();
        let totals = CartTotals::compute(items.iter().map(|i| (i.price, i.quantity)));

        Self {
            id: cart.id,
            user_id: cart.user_id,
            items,
            totals,
            updated_at: cart.updated_at,
        }
    }
}

pub struct CartService<'a> {
    stores: &'a Stores,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(stores: &'a Stores) -> Self {
        Self { stores }
    }

    async fn view(&self, cart: Cart) -> Result<CartView> {
        let products = self.stores.products.get_many(&cart.product_ids()).await?;
        Ok(CartView::build(cart, &products))
    }

    async fn mutate<F>(&self, user_id: &UserId, change: F) -> Result<CartView>
    where
        F: FnOnce(&mut Cart) -> Result<()> + Send,
    {
        let mut cart = self.stores.carts.get_or_create(user_id).await?;
        change(&mut cart)?;
        let saved = self.stores.carts.save(&cart).await?;
        self.view(saved).await
    }

    /// The user's cart, created empty on first access.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the store fails.
    pub async fn get(&self, user_id: &UserId) -> Result<CartView> {
        let cart = self.stores.carts.get_or_create(user_id).await?;
        self.view(cart).await
    }

    /// # Errors
    ///
    /// Returns `NotFound` for an unknown product or `Validation` for a bad
    /// quantity.
    #[instrument(skip(self, request), fields(user_id = %user_id, product_id = %request.product_id))]
    pub async fn add(&self, user_id: &UserId, request: AddToCart) -> Result<CartView> {
        let product_id: ProductId = request
            .product_id
            .trim()
            .parse()
            .map_err(|_| AppError::not_found("Product not found"))?;
        if self.stores.products.get(product_id).await?.is_none() {
            return Err(AppError::not_found("Product not found"));
        }
        self.mutate(user_id, |cart| {
            cart.add(product_id, request.quantity)?;
            Ok(())
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `Validation` for a quantity below 1 or `NotFound` for an
    /// unknown line.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn set_quantity(
        &self,
        user_id: &UserId,
        line_id: CartLineId,
        quantity: Option<i64>,
    ) -> Result<CartView> {
        let quantity = quantity.ok_or_else(|| AppError::validation("quantity is required"))?;
        self.mutate(user_id, |cart| Ok(cart.set_quantity(line_id, quantity)?))
            .await
    }

    /// # Errors
    ///
    /// Returns `NotFound` for an unknown line.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn remove(&self, user_id: &UserId, line_id: CartLineId) -> Result<CartView> {
        self.mutate(user_id, |cart| {
            cart.remove(line_id)?;
            Ok(())
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `Database` if the store fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn clear(&self, user_id: &UserId) -> Result<CartView> {
        self.mutate(user_id, |cart| {
            cart.clear();
            Ok(())
        })
        .await
    }
}
