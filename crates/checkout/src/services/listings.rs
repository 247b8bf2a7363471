//! Listing catalog trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{ListingId, UserId};
use domain::{FieldError, FieldErrorCode, FieldErrors, Money};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{CheckoutError, Result};

/// The authoritative price, title and seller of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub seller_id: UserId,
    pub title: String,
    pub price: Money,
}

impl Listing {
    pub fn new(seller_id: UserId, title: impl Into<String>, price: Money) -> Self {
        Self {
            id: ListingId::new(),
            seller_id,
            title: title.into(),
            price,
        }
    }

    fn validate(&self) -> Result<()> {
        let mut errors = FieldErrors::new();
        errors.require("title", Some(self.title.as_str()));
        if self.price.is_negative() {
            errors.push(FieldError::new(
                "price",
                FieldErrorCode::Invalid,
                "price must not be negative",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CheckoutError::Validation(errors))
        }
    }
}

#[async_trait]
pub trait ListingCatalog: Send + Sync {
    async fn get(&self, listing_id: ListingId) -> Result<Option<Listing>>;

    /// Inserts or replaces a listing.
    async fn upsert(&self, listing: Listing) -> Result<()>;
}

/// In-memory listing catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryListingCatalog {
    listings: Arc<RwLock<HashMap<ListingId, Listing>>>,
}

impl InMemoryListingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn remove(&self, listing_id: ListingId) {
        self.listings.write().await.remove(&listing_id);
    }
}

#[async_trait]
impl ListingCatalog for InMemoryListingCatalog {
    async fn get(&self, listing_id: ListingId) -> Result<Option<Listing>> {
        Ok(self.listings.read().await.get(&listing_id).cloned())
    }

    async fn upsert(&self, listing: Listing) -> Result<()> {
        listing.validate()?;
        self.listings.write().await.insert(listing.id, listing);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_replaces_price() {
        let catalog = InMemoryListingCatalog::new();
        let mut listing = Listing::new(UserId::new(), "Bike", Money::from_major(300));
        catalog.upsert(listing.clone()).await.unwrap();

        listing.price = Money::from_major(250);
        catalog.upsert(listing.clone()).await.unwrap();

        let stored = catalog.get(listing.id).await.unwrap().unwrap();
        assert_eq!(stored.price, Money::from_major(250));
    }

    #[tokio::test]
    async fn invalid_listing_is_refused() {
        let catalog = InMemoryListingCatalog::new();
        let listing = Listing::new(UserId::new(), " ", Money::from_cents(-1));

        match catalog.upsert(listing).await {
            Err(CheckoutError::Validation(errors)) => {
                assert_eq!(errors.fields(), vec!["title", "price"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn removed_listing_is_gone() {
        let catalog = InMemoryListingCatalog::new();
        let listing = Listing::new(UserId::new(), "Lamp", Money::from_major(20));
        catalog.upsert(listing.clone()).await.unwrap();
        catalog.remove(listing.id).await;
        assert!(catalog.get(listing.id).await.unwrap().is_none());
    }
}
