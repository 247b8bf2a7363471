//! Core projection trait and position tracking.

use async_trait::async_trait;
use domain::{Aggregate, DomainEvent, Order, OrderEvent};
use event_store::EventEnvelope;

use crate::Result;

/// Tracks how far a projection has read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionPosition {
    pub events_processed: u64,
    /// Log sequence of the last stored event delivered by catch-up.
    pub last_sequence: u64,
}

impl ProjectionPosition {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn advance(&self) -> Self {
        Self {
            events_processed: self.events_processed + 1,
            ..*self
        }
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "position({} @ {})", self.events_processed, self.last_sequence)
    }
}

/// A subscriber that folds stored events into a read model.
///
/// Every event in the store is delivered to every projection in insertion
/// order; a projection advances its position even for events it ignores.
#[async_trait]
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &EventEnvelope) -> Result<()>;

    async fn position(&self) -> ProjectionPosition;

    /// Clears the read model back to its initial state.
    async fn reset(&self) -> Result<()>;
}

/// Decodes an order event, or `None` for envelopes of other aggregates.
pub fn decode_order_event(envelope: &EventEnvelope) -> Result<Option<OrderEvent>> {
    if envelope.aggregate_type != Order::aggregate_type() {
        return Ok(None);
    }
    Ok(Some(OrderEvent::from_envelope(envelope)?))
}
