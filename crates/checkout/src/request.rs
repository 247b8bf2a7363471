//! Typed checkout input.

use common::{AddressId, AggregateId, UserId};
use domain::{AddressSelection, Aggregate, ManualAddress, Money, Order};
use serde::{Deserialize, Serialize};

/// A buyer's checkout submission.
///
/// Only the fields declared here are accepted; anything else in the body is
/// refused when deserializing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckoutRequest {
    pub buyer_id: UserId,
    #[serde(default)]
    pub use_saved_address: bool,
    #[serde(default)]
    pub address_id: Option<AddressId>,

    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub discount: Option<Money>,
    #[serde(default)]
    pub buyer_note: Option<String>,
    /// Retrying with the same key returns the orders of the first attempt.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl CheckoutRequest {
    pub fn new(buyer_id: UserId, payment_method: impl Into<String>) -> Self {
        Self {
            buyer_id,
            payment_method: Some(payment_method.into()),
            ..Self::default()
        }
    }

    /// Ships to a saved address; `None` picks the default one.
    pub fn with_saved_address(mut self, address_id: Option<AddressId>) -> Self {
        self.use_saved_address = true;
        self.address_id = address_id;
        self
    }

    pub fn with_manual_address(mut self, manual: ManualAddress) -> Self {
        self.use_saved_address = false;
        self.first_name = manual.first_name;
        self.last_name = manual.last_name;
        self.address = manual.address;
        self.city = manual.city;
        self.region = manual.region;
        self.postal_code = manual.postal_code;
        self.country = manual.country;
        self.email = manual.email;
        self.phone = manual.phone;
        self
    }

    pub fn with_contact(mut self, email: impl Into<String>, phone: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self.phone = Some(phone.into());
        self
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = Some(discount);
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn address_selection(&self) -> AddressSelection {
        AddressSelection {
            use_saved: self.use_saved_address,
            selected_id: self.address_id,
        }
    }

    pub fn manual_address(&self) -> ManualAddress {
        ManualAddress {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            region: self.region.clone(),
            postal_code: self.postal_code.clone(),
            country: self.country.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }

    /// The note to freeze into each order, if it has any content.
    pub fn note(&self) -> Option<String> {
        self.buyer_note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }

    pub(crate) fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Outcome of a checkout: one order per seller, in cart order.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub orders: Vec<Order>,
    /// True when the orders came from an earlier attempt with the same key.
    pub replayed: bool,
    /// False when the orders were placed but the cart still holds the items.
    /// Always true on replay.
    pub cart_cleared: bool,
}

impl CheckoutReceipt {
    pub fn order_ids(&self) -> Vec<AggregateId> {
        self.orders.iter().filter_map(|o| o.id()).collect()
    }
}
