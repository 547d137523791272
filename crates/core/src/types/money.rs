//! Money helpers built on decimal arithmetic.
//!
//! All amounts are in the store currency (USD) using the standard unit
//! (dollars, not cents).

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary amount to cents.
///
/// Midpoints round away from zero and the result always carries two decimal
/// places, so `110` becomes `110.00` when serialized.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Format an amount for receipts, e.g. `$118.80`.
#[must_use]
pub fn format_usd(amount: Decimal) -> String {
    format!("${}", round_money(amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::unwrap_used)]
    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_round_money_pads_scale() {
        assert_eq!(round_money(d("110")).to_string(), "110.00");
        assert_eq!(round_money(d("8.8")).to_string(), "8.80");
    }

    #[test]
    fn test_round_money_midpoint_away_from_zero() {
        assert_eq!(round_money(d("1.005")), d("1.01"));
        assert_eq!(round_money(d("1.004")), d("1.00"));
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(d("36.6")), "$36.60");
    }
}
