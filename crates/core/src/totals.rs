//! Cart total calculation.
//!
//! Totals are always derived from current catalog prices and never stored on
//! the cart, because prices can change between reads.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::round_money;

/// Sales tax rate applied to the subtotal (8%).
pub const TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

/// Subtotals strictly above this ship for free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Flat shipping charge for orders at or below the threshold.
pub const FLAT_SHIPPING: Decimal = Decimal::from_parts(15, 0, 0, false, 0);

/// Derived totals for a set of priced lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    /// Sum of quantities, not the number of distinct lines.
    pub item_count: u32,
}

impl CartTotals {
    /// Totals of an empty cart.
    ///
    /// Shipping is still charged because an empty subtotal is below the
    /// free-shipping threshold.
    #[must_use]
    pub fn empty() -> Self {
        Self::compute(std::iter::empty())
    }

    /// Compute totals from `(unit price, quantity)` pairs.
    ///
    /// Tax and total are computed on the unrounded subtotal; every monetary
    /// output is then rounded to cents.
    #[must_use]
    pub fn compute<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (Decimal, u32)>,
    {
        let (subtotal, item_count) = lines.into_iter().fold(
            (Decimal::ZERO, 0_u32),
            |(subtotal, count), (price, quantity)| {
                (
                    subtotal + price * Decimal::from(quantity),
                    count.saturating_add(quantity),
                )
            },
        );

        let tax = subtotal * TAX_RATE;
        let shipping = if subtotal > FREE_SHIPPING_THRESHOLD {
            Decimal::ZERO
        } else {
            FLAT_SHIPPING
        };
        let total = subtotal + tax + shipping;

        Self {
            subtotal: round_money(subtotal),
            tax: round_money(tax),
            shipping: round_money(shipping),
            total: round_money(total),
            item_count,
        }
    }
}
