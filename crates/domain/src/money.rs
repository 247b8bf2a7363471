//! Monetary amounts.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a decimal amount cannot be represented as [`Money`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("amount {0} is out of range")]
pub struct MoneyRangeError(pub Decimal);

/// Money amount held in minor units (cents) of the store's single currency.
///
/// On the wire it is a decimal string with exactly two fraction digits,
/// e.g. `"28000.00"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "Decimal", try_from = "Decimal")]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates an amount from minor units.
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates an amount from whole currency units.
    pub const fn from_major(units: i64) -> Self {
        Self {
            cents: units * 100,
        }
    }

    /// Converts a decimal, rounding half-up to two fraction digits.
    pub fn from_decimal(amount: Decimal) -> Result<Self, MoneyRangeError> {
        let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        (rounded * Decimal::ONE_HUNDRED)
            .to_i64()
            .map(Self::from_cents)
            .ok_or(MoneyRangeError(amount))
    }

    pub const fn zero() -> Self {
        Self { cents: 0 }
    }

    pub const fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the amount as a two-digit decimal.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.cents, 2)
    }

    pub const fn is_positive(&self) -> bool {
        self.cents > 0
    }

    pub const fn is_zero(&self) -> bool {
        self.cents == 0
    }

    pub const fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity. `None` when the product leaves the `i64` cent range.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.cents
            .checked_mul(i64::from(quantity))
            .map(Money::from_cents)
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.cents.checked_add(rhs.cents).map(Money::from_cents)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.cents.checked_sub(rhs.cents).map(Money::from_cents)
    }

    /// Applies a rate given in basis points (1200 = 12%), rounding half-up to the cent.
    pub fn apply_rate(&self, basis_points: u32) -> Money {
        let product = i128::from(self.cents) * i128::from(basis_points);
        let magnitude = (product.abs() + 5_000) / 10_000;
        let cents = if product < 0 { -magnitude } else { magnitude };
        Money {
            cents: cents as i64,
        }
    }

    /// Returns zero for negative amounts.
    pub fn clamp_non_negative(self) -> Money {
        if self.is_negative() { Money::zero() } else { self }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.to_decimal()
    }
}

impl TryFrom<Decimal> for Money {
    type Error = MoneyRangeError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Money::from_decimal(amount)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.cents -= rhs.cents;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}
