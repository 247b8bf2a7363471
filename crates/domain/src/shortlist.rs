//! Comparison and favourite lists of listings.
//!
//! A shortlist is an ordered set of listing ids kept per user. The comparison
//! list holds at most [`COMPARE_CAPACITY`] entries; favourites are unbounded.
//! Lists are persisted as JSON through a [`ShortlistStore`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{ListingId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Maximum number of listings in a comparison list.
pub const COMPARE_CAPACITY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortlistKind {
    Compare,
    Favorites,
}

impl ShortlistKind {
    pub fn capacity(&self) -> Option<usize> {
        match self {
            ShortlistKind::Compare => Some(COMPARE_CAPACITY),
            ShortlistKind::Favorites => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShortlistKind::Compare => "compare",
            ShortlistKind::Favorites => "favorites",
        }
    }
}

impl std::str::FromStr for ShortlistKind {
    type Err = ShortlistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compare" => Ok(ShortlistKind::Compare),
            "favorites" | "favourites" => Ok(ShortlistKind::Favorites),
            other => Err(ShortlistError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ShortlistError {
    #[error("{kind:?} list is full ({capacity} items)")]
    Full {
        kind: ShortlistKind,
        capacity: usize,
    },

    #[error("unknown shortlist: {0}")]
    UnknownKind(String),

    #[error("shortlist storage error: {0}")]
    Storage(String),

    #[error("corrupt shortlist data: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// An ordered, duplicate-free list of listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortlist {
    kind: ShortlistKind,
    items: Vec<ListingId>,
}

impl Shortlist {
    pub fn new(kind: ShortlistKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
        }
    }

    pub fn kind(&self) -> ShortlistKind {
        self.kind
    }

    pub fn items(&self) -> &[ListingId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, listing_id: ListingId) -> bool {
        self.items.contains(&listing_id)
    }

    pub fn is_full(&self) -> bool {
        self.kind
            .capacity()
            .is_some_and(|capacity| self.items.len() >= capacity)
    }

    /// Adds a listing. Adding one already present is a no-op.
    pub fn add(&mut self, listing_id: ListingId) -> Result<(), ShortlistError> {
        if self.contains(listing_id) {
            return Ok(());
        }
        if let Some(capacity) = self.kind.capacity()
            && self.items.len() >= capacity
        {
            return Err(ShortlistError::Full {
                kind: self.kind,
                capacity,
            });
        }
        self.items.push(listing_id);
        Ok(())
    }

    /// Removes a listing, returning whether it was present.
    pub fn remove(&mut self, listing_id: ListingId) -> bool {
        let before = self.items.len();
        self.items.retain(|id| *id != listing_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Key-value persistence for shortlists.
#[async_trait]
pub trait ShortlistStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, ShortlistError>;

    async fn put(&self, key: &str, value: String) -> Result<(), ShortlistError>;
}

/// Shortlist storage held in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShortlistStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryShortlistStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShortlistStore for InMemoryShortlistStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ShortlistError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), ShortlistError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Loads, changes and saves per-user shortlists.
#[derive(Debug, Clone)]
pub struct ShortlistService<K: ShortlistStore> {
    store: K,
}

impl<K: ShortlistStore> ShortlistService<K> {
    pub fn new(store: K) -> Self {
        Self { store }
    }

    fn key(owner: UserId, kind: ShortlistKind) -> String {
        format!("shortlist:{}:{owner}", kind.as_str())
    }

    pub async fn load(&self, owner: UserId, kind: ShortlistKind) -> Result<Shortlist, ShortlistError> {
        match self.store.get(&Self::key(owner, kind)).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Shortlist::new(kind)),
        }
    }

    async fn save(&self, owner: UserId, list: &Shortlist) -> Result<(), ShortlistError> {
        let json = serde_json::to_string(list)?;
        self.store.put(&Self::key(owner, list.kind()), json).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn add(
        &self,
        owner: UserId,
        kind: ShortlistKind,
        listing_id: ListingId,
    ) -> Result<Shortlist, ShortlistError> {
        let mut list = self.load(owner, kind).await?;
        list.add(listing_id)?;
        self.save(owner, &list).await?;
        Ok(list)
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove(
        &self,
        owner: UserId,
        kind: ShortlistKind,
        listing_id: ListingId,
    ) -> Result<Shortlist, ShortlistError> {
        let mut list = self.load(owner, kind).await?;
        if list.remove(listing_id) {
            self.save(owner, &list).await?;
        }
        Ok(list)
    }
}
