//! Domain error types.

use common::AggregateId;
use event_store::EventStoreError;
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The event store failed.
    #[error("Event store error: {0}")]
    EventStore(EventStoreError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Order not found: {0}")]
    OrderNotFound(AggregateId),

    /// Someone else changed the aggregate since it was read. Re-read and retry.
    #[error("Concurrent modification of {aggregate_id}: {detail}")]
    ConcurrentModification {
        aggregate_id: AggregateId,
        detail: String,
    },

    /// A command was refused by an aggregate outside the order domain.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<EventStoreError> for DomainError {
    fn from(e: EventStoreError) -> Self {
        match e {
            EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual,
            } => DomainError::ConcurrentModification {
                aggregate_id,
                detail: format!("expected version {expected}, found {actual}"),
            },
            other => DomainError::EventStore(other),
        }
    }
}

impl DomainError {
    /// Returns true for failures of the storage layer rather than of the request.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            DomainError::EventStore(_) | DomainError::Serialization(_)
        )
    }
}
