//! Value objects for the order domain.

use std::str::FromStr;

use common::ListingId;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::pricing::PricedLine;

/// How the buyer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery.
    Cod,
    Kaspi,
    Paypal,
    Amazon,
    /// Card capture is handled by the payment gateway.
    Card,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Cod,
        PaymentMethod::Kaspi,
        PaymentMethod::Paypal,
        PaymentMethod::Amazon,
        PaymentMethod::Card,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::Kaspi => "kaspi",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::Amazon => "amazon",
            PaymentMethod::Card => "card",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raised when a string names no supported payment method.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported payment method: {0}")]
pub struct UnsupportedPaymentMethod(pub String);

impl FromStr for PaymentMethod {
    type Err = UnsupportedPaymentMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| UnsupportedPaymentMethod(s.to_string()))
    }
}

/// A listing frozen into an order at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub listing_id: ListingId,
    pub title: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderLine {
    pub fn new(
        listing_id: ListingId,
        title: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Self {
        Self {
            listing_id,
            title: title.into(),
            unit_price,
            quantity,
        }
    }
}

impl PricedLine for OrderLine {
    fn unit_price(&self) -> Money {
        self.unit_price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}
