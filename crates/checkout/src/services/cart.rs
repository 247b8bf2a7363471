//! Cart store trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartItemId, ListingId, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{CheckoutError, Result};

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 10_000;

/// Refuses quantities outside `1..=MAX_LINE_QUANTITY`.
pub fn check_quantity(quantity: u32) -> Result<u32> {
    if (1..=MAX_LINE_QUANTITY).contains(&quantity) {
        Ok(quantity)
    } else {
        Err(CheckoutError::InvalidQuantity)
    }
}

/// One line in a buyer's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub listing_id: ListingId,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

/// Per-buyer carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Adds a listing to the cart. A listing already present has its quantity increased.
    ///
    /// The resulting line quantity must stay within `1..=MAX_LINE_QUANTITY`.
    async fn add_item(&self, buyer_id: UserId, listing_id: ListingId, quantity: u32)
    -> Result<CartItem>;

    async fn set_quantity(
        &self,
        buyer_id: UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartItem>;

    async fn remove_item(&self, buyer_id: UserId, item_id: CartItemId) -> Result<()>;

    /// Cart lines in the order they were first added.
    async fn items(&self, buyer_id: UserId) -> Result<Vec<CartItem>>;

    /// Removes the given lines; ids not in the cart are ignored.
    async fn clear(&self, buyer_id: UserId, item_ids: &[CartItemId]) -> Result<()>;
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    carts: HashMap<UserId, Vec<CartItem>>,
    fail_on_clear: bool,
}

/// In-memory cart store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartStore {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `clear` call fail.
    pub async fn set_fail_on_clear(&self, fail: bool) {
        self.state.write().await.fail_on_clear = fail;
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn add_item(
        &self,
        buyer_id: UserId,
        listing_id: ListingId,
        quantity: u32,
    ) -> Result<CartItem> {
        check_quantity(quantity)?;

        let mut state = self.state.write().await;
        let cart = state.carts.entry(buyer_id).or_default();

        if let Some(existing) = cart.iter_mut().find(|i| i.listing_id == listing_id) {
            existing.quantity = check_quantity(existing.quantity.saturating_add(quantity))?;
            return Ok(existing.clone());
        }

        let item = CartItem {
            id: CartItemId::new(),
            listing_id,
            quantity,
            added_at: Utc::now(),
        };
        cart.push(item.clone());
        Ok(item)
    }

    async fn set_quantity(
        &self,
        buyer_id: UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartItem> {
        check_quantity(quantity)?;

        let mut state = self.state.write().await;
        let item = state
            .carts
            .get_mut(&buyer_id)
            .and_then(|cart| cart.iter_mut().find(|i| i.id == item_id))
            .ok_or(CheckoutError::CartItemNotFound(item_id))?;
        item.quantity = quantity;
        Ok(item.clone())
    }

    async fn remove_item(&self, buyer_id: UserId, item_id: CartItemId) -> Result<()> {
        let mut state = self.state.write().await;
        let cart = state
            .carts
            .get_mut(&buyer_id)
            .ok_or(CheckoutError::CartItemNotFound(item_id))?;
        let before = cart.len();
        cart.retain(|i| i.id != item_id);
        if cart.len() == before {
            return Err(CheckoutError::CartItemNotFound(item_id));
        }
        Ok(())
    }

    async fn items(&self, buyer_id: UserId) -> Result<Vec<CartItem>> {
        Ok(self
            .state
            .read()
            .await
            .carts
            .get(&buyer_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn clear(&self, buyer_id: UserId, item_ids: &[CartItemId]) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_clear {
            return Err(CheckoutError::Unavailable("cart store rejected clear".to_string()));
        }
        if let Some(cart) = state.carts.get_mut(&buyer_id) {
            cart.retain(|i| !item_ids.contains(&i.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn adding_the_same_listing_merges_quantity() {
        let carts = InMemoryCartStore::new();
        let buyer = UserId::new();
        let listing = ListingId::new();

        let first = carts.add_item(buyer, listing, 1).await.unwrap();
        let second = carts.add_item(buyer, listing, 2).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity, 3);
        assert_eq!(carts.items(buyer).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn zero_quantity_is_refused() {
        let carts = InMemoryCartStore::new();
        let buyer = UserId::new();
        let result = carts.add_item(buyer, ListingId::new(), 0).await;
        assert!(matches!(result, Err(CheckoutError::InvalidQuantity)));

        let item = carts.add_item(buyer, ListingId::new(), 1).await.unwrap();
        let result = carts.set_quantity(buyer, item.id, 0).await;
        assert!(matches!(result, Err(CheckoutError::InvalidQuantity)));
    }

    #[tokio::test]
    async fn quantity_above_the_line_limit_is_refused() {
        let carts = InMemoryCartStore::new();
        let buyer = UserId::new();
        let listing = ListingId::new();

        let result = carts.add_item(buyer, listing, 3_000_000_000).await;
        assert!(matches!(result, Err(CheckoutError::InvalidQuantity)));

        let item = carts.add_item(buyer, listing, MAX_LINE_QUANTITY).await.unwrap();
        let merged = carts.add_item(buyer, listing, 1).await;
        assert!(matches!(merged, Err(CheckoutError::InvalidQuantity)));
        assert_eq!(carts.items(buyer).await.unwrap()[0].quantity, MAX_LINE_QUANTITY);

        let result = carts.set_quantity(buyer, item.id, MAX_LINE_QUANTITY + 1).await;
        assert!(matches!(result, Err(CheckoutError::InvalidQuantity)));
    }

    #[tokio::test]
    async fn set_quantity_and_remove() {
        let carts = InMemoryCartStore::new();
        let buyer = UserId::new();
        let item = carts.add_item(buyer, ListingId::new(), 1).await.unwrap();

        let updated = carts.set_quantity(buyer, item.id, 5).await.unwrap();
        assert_eq!(updated.quantity, 5);

        carts.remove_item(buyer, item.id).await.unwrap();
        assert!(carts.items(buyer).await.unwrap().is_empty());
        assert!(matches!(
            carts.remove_item(buyer, item.id).await,
            Err(CheckoutError::CartItemNotFound(_))
        ));
    }

    #[tokio::test]
    async fn clear_removes_only_named_items() {
        let carts = InMemoryCartStore::new();
        let buyer = UserId::new();
        let keep = carts.add_item(buyer, ListingId::new(), 1).await.unwrap();
        let gone = carts.add_item(buyer, ListingId::new(), 1).await.unwrap();

        carts.clear(buyer, &[gone.id]).await.unwrap();

        let items = carts.items(buyer).await.unwrap();
        assert_eq!(items, vec![keep]);
    }

    #[tokio::test]
    async fn carts_are_per_buyer() {
        let carts = InMemoryCartStore::new();
        carts.add_item(UserId::new(), ListingId::new(), 1).await.unwrap();
        assert!(carts.items(UserId::new()).await.unwrap().is_empty());
    }
}
