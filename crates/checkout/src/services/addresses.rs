//! Address book trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use domain::{Address, FieldErrors};
use tokio::sync::RwLock;

use crate::error::{CheckoutError, Result};

#[async_trait]
pub trait AddressBook: Send + Sync {
    /// A user's saved addresses in the order they were added.
    async fn addresses_for(&self, user_id: UserId) -> Result<Vec<Address>>;

    async fn add(&self, address: Address) -> Result<()>;
}

/// In-memory address book.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAddressBook {
    addresses: Arc<RwLock<HashMap<UserId, Vec<Address>>>>,
}

impl InMemoryAddressBook {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AddressBook for InMemoryAddressBook {
    async fn addresses_for(&self, user_id: UserId) -> Result<Vec<Address>> {
        Ok(self
            .addresses
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add(&self, address: Address) -> Result<()> {
        let mut errors = FieldErrors::new();
        errors.require("full_name", Some(address.full_name.as_str()));
        errors.require("address_line_1", Some(address.address_line_1.as_str()));
        errors.require("city", Some(address.city.as_str()));
        errors.require("postal_code", Some(address.postal_code.as_str()));
        errors.require("country", Some(address.country.as_str()));
        if !errors.is_empty() {
            return Err(CheckoutError::Validation(errors));
        }

        self.addresses
            .write()
            .await
            .entry(address.user_id)
            .or_default()
            .push(address);
        Ok(())
    }
}
