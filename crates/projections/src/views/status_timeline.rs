//! Per-order status history.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use domain::{ActorRole, OrderEvent, OrderStatus};
use event_store::EventEnvelope;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition, decode_order_event};
use crate::read_model::ReadModel;

/// A single step in an order's history. The first entry has no `from`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub from: Option<OrderStatus>,
    pub status: OrderStatus,
    pub actor_id: UserId,
    pub actor_role: ActorRole,
    pub tracking_number: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct StatusTimelineView {
    timelines: Arc<RwLock<HashMap<AggregateId, Vec<TimelineEntry>>>>,
    position: Arc<RwLock<ProjectionPosition>>,
}

impl StatusTimelineView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries for an order, oldest first. `None` if the order is unknown.
    pub async fn get_timeline(&self, order_id: AggregateId) -> Option<Vec<TimelineEntry>> {
        self.timelines.read().await.get(&order_id).cloned()
    }

    /// The last time the order changed status.
    pub async fn last_changed_at(&self, order_id: AggregateId) -> Option<DateTime<Utc>> {
        self.timelines
            .read()
            .await
            .get(&order_id)
            .and_then(|entries| entries.last())
            .map(|entry| entry.at)
    }
}

#[async_trait]
impl Projection for StatusTimelineView {
    fn name(&self) -> &'static str {
        "StatusTimelineView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if let Some(order_event) = decode_order_event(event)? {
            let mut timelines = self.timelines.write().await;
            match order_event {
                OrderEvent::OrderPlaced(data) => {
                    timelines.insert(
                        data.order_id,
                        vec![TimelineEntry {
                            from: None,
                            status: OrderStatus::Pending,
                            actor_id: data.buyer_id,
                            actor_role: ActorRole::Buyer,
                            tracking_number: None,
                            at: data.placed_at,
                        }],
                    );
                }
                OrderEvent::OrderStatusChanged(data) => {
                    timelines
                        .entry(data.order_id)
                        .or_default()
                        .push(TimelineEntry {
                            from: Some(data.from),
                            status: data.to,
                            actor_id: data.actor_id,
                            actor_role: data.actor_role,
                            tracking_number: data.tracking_number,
                            at: data.changed_at,
                        });
                }
            }
        }

        let mut pos = self.position.write().await;
        *pos = pos.advance();
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        *self.position.read().await
    }

    async fn reset(&self) -> Result<()> {
        self.timelines.write().await.clear();
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}

#[async_trait]
impl ReadModel for StatusTimelineView {
    fn name(&self) -> &'static str {
        "StatusTimelineView"
    }

    async fn count(&self) -> usize {
        self.timelines.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{placed_envelope, status_envelope};

    #[tokio::test]
    async fn records_each_step_in_order() {
        let view = StatusTimelineView::new();
        let order_id = AggregateId::new();
        let buyer = UserId::new();
        let seller = UserId::new();

        view.handle(&placed_envelope(order_id, buyer, seller))
            .await
            .unwrap();
        view.handle(&status_envelope(order_id, OrderStatus::Pending, OrderStatus::Accepted, seller, 2))
            .await
            .unwrap();
        view.handle(&status_envelope(order_id, OrderStatus::Accepted, OrderStatus::Packed, seller, 3))
            .await
            .unwrap();

        let timeline = view.get_timeline(order_id).await.unwrap();
        let statuses: Vec<_> = timeline.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![OrderStatus::Pending, OrderStatus::Accepted, OrderStatus::Packed]
        );
        assert_eq!(timeline[0].from, None);
        assert_eq!(timeline[0].actor_id, buyer);
        assert_eq!(timeline[2].from, Some(OrderStatus::Accepted));
        assert_eq!(timeline[2].actor_role, ActorRole::Seller);
        assert_eq!(view.last_changed_at(order_id).await, Some(timeline[2].at));
    }

    #[tokio::test]
    async fn unknown_order_has_no_timeline() {
        let view = StatusTimelineView::new();
        assert!(view.get_timeline(AggregateId::new()).await.is_none());
        assert!(view.last_changed_at(AggregateId::new()).await.is_none());
    }

    #[tokio::test]
    async fn ignores_other_aggregates_but_advances() {
        let view = StatusTimelineView::new();
        let other = EventEnvelope::new(
            AggregateId::new(),
            "Cart",
            event_store::Version::first(),
            "ItemAdded",
            serde_json::json!({}),
        );
        view.handle(&other).await.unwrap();

        assert_eq!(ReadModel::count(&view).await, 0);
        assert_eq!(view.position().await.events_processed, 1);
    }
}
