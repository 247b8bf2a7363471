//! Checkout pricing: subtotal, shipping, VAT, discount and total.

use std::fmt::Debug;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

/// VAT rate in basis points (12%).
pub const VAT_RATE_BASIS_POINTS: u32 = 1200;

/// Anything with a unit price and a quantity.
pub trait PricedLine {
    fn unit_price(&self) -> Money;

    fn quantity(&self) -> u32;

    /// `None` when the amount leaves the money range.
    fn line_total(&self) -> Option<Money> {
        self.unit_price().checked_multiply(self.quantity())
    }
}

/// Sum of line totals, or `None` if any step overflows.
pub fn subtotal_of<L: PricedLine>(lines: &[L]) -> Option<Money> {
    lines
        .iter()
        .try_fold(Money::zero(), |acc, line| acc.checked_add(line.line_total()?))
}

impl PricedLine for (Money, u32) {
    fn unit_price(&self) -> Money {
        self.0
    }

    fn quantity(&self) -> u32 {
        self.1
    }
}

/// Decides the shipping charge for a non-empty set of lines.
pub trait ShippingPolicy: Debug + Send + Sync {
    fn shipping_for(&self, subtotal: Money, units: u64) -> Money;
}

/// No shipping charge.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeShipping;

impl ShippingPolicy for FreeShipping {
    fn shipping_for(&self, _subtotal: Money, _units: u64) -> Money {
        Money::zero()
    }
}

/// A fixed fee per order regardless of contents.
#[derive(Debug, Clone, Copy)]
pub struct FlatRateShipping {
    pub fee: Money,
}

impl ShippingPolicy for FlatRateShipping {
    fn shipping_for(&self, _subtotal: Money, _units: u64) -> Money {
        self.fee.clamp_non_negative()
    }
}

/// The priced figures of a cart or order.
///
/// `total == subtotal + shipping + tax - discount` always holds: the applied
/// discount never exceeds the pre-discount amount, so `total` bottoms out at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Money,
    pub shipping: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

impl PriceBreakdown {
    /// Amount due before any discount.
    pub fn pre_discount_total(&self) -> Money {
        self.subtotal + self.shipping + self.tax
    }

    /// Returns true when the figures add up.
    pub fn is_consistent(&self) -> bool {
        let expected = self
            .subtotal
            .checked_add(self.shipping)
            .and_then(|m| m.checked_add(self.tax))
            .and_then(|m| m.checked_sub(self.discount));
        expected == Some(self.total) && !self.total.is_negative()
    }
}

/// A cart whose figures do not fit the money range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("line or order amount is out of range")]
    Overflow,
}

/// Computes price breakdowns with a pluggable shipping policy.
#[derive(Debug, Clone)]
pub struct PricingCalculator {
    shipping: Arc<dyn ShippingPolicy>,
    vat_basis_points: u32,
}

impl Default for PricingCalculator {
    fn default() -> Self {
        Self::new(Arc::new(FreeShipping))
    }
}

impl PricingCalculator {
    pub fn new(shipping: Arc<dyn ShippingPolicy>) -> Self {
        Self {
            shipping,
            vat_basis_points: VAT_RATE_BASIS_POINTS,
        }
    }

    pub fn shipping_policy(&self) -> &dyn ShippingPolicy {
        self.shipping.as_ref()
    }

    /// Prices `lines` and applies `discount`.
    ///
    /// Tax is taken on the full subtotal, before the discount. A negative
    /// discount counts as none. An empty set of lines prices to all zeros.
    /// Fails when any amount leaves the money range.
    pub fn compute<L: PricedLine>(
        &self,
        lines: &[L],
        discount: Money,
    ) -> Result<PriceBreakdown, PricingError> {
        if lines.is_empty() {
            return Ok(PriceBreakdown::default());
        }

        let subtotal = subtotal_of(lines).ok_or(PricingError::Overflow)?;
        let units: u64 = lines.iter().map(|line| u64::from(line.quantity())).sum();
        let shipping = self.shipping.shipping_for(subtotal, units);
        let tax = subtotal.apply_rate(self.vat_basis_points);

        let pre_discount = subtotal
            .checked_add(shipping)
            .and_then(|m| m.checked_add(tax))
            .ok_or(PricingError::Overflow)?;
        let discount = discount.clamp_non_negative().min(pre_discount);

        Ok(PriceBreakdown {
            subtotal,
            shipping,
            tax,
            discount,
            total: pre_discount - discount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[(i64, u32)]) -> Vec<(Money, u32)> {
        items
            .iter()
            .map(|(price, qty)| (Money::from_major(*price), *qty))
            .collect()
    }

    #[test]
    fn reference_cart() {
        let calc = PricingCalculator::default();
        let breakdown = calc
            .compute(&lines(&[(10000, 2), (5000, 1)]), Money::zero())
            .unwrap();

        assert_eq!(breakdown.subtotal, Money::from_major(25000));
        assert_eq!(breakdown.tax, Money::from_major(3000));
        assert_eq!(breakdown.shipping, Money::zero());
        assert_eq!(breakdown.discount, Money::zero());
        assert_eq!(breakdown.total, Money::from_major(28000));
        assert_eq!(breakdown.total.to_string(), "28000.00");
    }

    #[test]
    fn empty_cart_is_all_zero() {
        let calc = PricingCalculator::new(Arc::new(FlatRateShipping {
            fee: Money::from_major(500),
        }));
        let empty: Vec<(Money, u32)> = Vec::new();
        assert_eq!(
            calc.compute(&empty, Money::from_major(10)),
            Ok(PriceBreakdown::default())
        );
    }

    #[test]
    fn tax_ignores_discount() {
        let calc = PricingCalculator::default();
        let items = lines(&[(999, 3)]);
        let without = calc.compute(&items, Money::zero()).unwrap();
        let with = calc.compute(&items, Money::from_major(100)).unwrap();

        assert_eq!(without.tax, with.tax);
        assert_eq!(with.tax, with.subtotal.apply_rate(VAT_RATE_BASIS_POINTS));
        assert_eq!(with.total, without.total - Money::from_major(100));
    }

    #[test]
    fn oversized_discount_clamps_total_to_zero() {
        let calc = PricingCalculator::default();
        let breakdown = calc
            .compute(&lines(&[(100, 1)]), Money::from_major(1_000_000))
            .unwrap();

        assert_eq!(breakdown.total, Money::zero());
        assert_eq!(breakdown.discount, breakdown.pre_discount_total());
        assert!(breakdown.is_consistent());
    }

    #[test]
    fn negative_discount_counts_as_none() {
        let calc = PricingCalculator::default();
        let breakdown = calc
            .compute(&lines(&[(100, 1)]), Money::from_major(-50))
            .unwrap();
        assert_eq!(breakdown.discount, Money::zero());
        assert_eq!(breakdown.total, Money::from_major(112));
    }

    #[test]
    fn flat_rate_shipping_is_untaxed() {
        let calc = PricingCalculator::new(Arc::new(FlatRateShipping {
            fee: Money::from_major(1500),
        }));
        let breakdown = calc.compute(&lines(&[(10000, 1)]), Money::zero()).unwrap();

        assert_eq!(breakdown.shipping, Money::from_major(1500));
        assert_eq!(breakdown.tax, Money::from_major(1200));
        assert_eq!(breakdown.total, Money::from_major(12700));
    }

    #[test]
    fn identity_holds_across_many_carts() {
        let calc = PricingCalculator::default();
        for price_cents in [0_i64, 1, 4, 5, 99, 12_345, 1_000_001] {
            for qty in [1_u32, 2, 7] {
                for discount_cents in [0_i64, 1, 500, 10_000_000] {
                    let items = vec![(Money::from_cents(price_cents), qty)];
                    let b = calc
                        .compute(&items, Money::from_cents(discount_cents))
                        .unwrap();
                    assert!(b.is_consistent(), "{b:?}");
                    assert_eq!(b.tax, b.subtotal.apply_rate(VAT_RATE_BASIS_POINTS));
                }
            }
        }
    }

    #[test]
    fn out_of_range_cart_is_refused() {
        let calc = PricingCalculator::default();

        let huge_line = vec![(Money::from_major(100_000_000_000), 1_000_000)];
        assert_eq!(calc.compute(&huge_line, Money::zero()), Err(PricingError::Overflow));

        let half = Money::from_cents(i64::MAX / 2 + 1);
        assert_eq!(
            calc.compute(&[(half, 1), (half, 1)], Money::zero()),
            Err(PricingError::Overflow)
        );
    }

    #[test]
    fn unit_count_does_not_wrap() {
        #[derive(Debug)]
        struct CountingShipping;

        impl ShippingPolicy for CountingShipping {
            fn shipping_for(&self, _subtotal: Money, units: u64) -> Money {
                Money::from_cents(i64::try_from(units).unwrap_or(i64::MAX))
            }
        }

        let calc = PricingCalculator::new(Arc::new(CountingShipping));
        let lines = vec![(Money::from_cents(1), 3_000_000_000), (Money::from_cents(1), 3_000_000_000)];
        let breakdown = calc.compute(&lines, Money::zero()).unwrap();

        assert_eq!(breakdown.subtotal, Money::from_cents(6_000_000_000));
        assert_eq!(breakdown.shipping, Money::from_cents(6_000_000_000));
        assert!(breakdown.is_consistent());
    }
}
