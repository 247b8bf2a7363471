//! Order domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use serde::{Deserialize, Serialize};

use crate::address::ResolvedAddress;
use crate::aggregate::DomainEvent;
use crate::pricing::PriceBreakdown;

use super::{ActorRole, OrderLine, OrderStatus, PaymentMethod};

/// Events that can occur on an order aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was placed at checkout.
    OrderPlaced(OrderPlacedData),

    /// Order moved along the state machine.
    OrderStatusChanged(StatusChangedData),
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "OrderPlaced",
            OrderEvent::OrderStatusChanged(_) => "OrderStatusChanged",
        }
    }
}

/// Data for OrderPlaced event. Everything here is frozen for the life of the order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlacedData {
    pub order_id: AggregateId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub lines: Vec<OrderLine>,
    pub pricing: PriceBreakdown,
    pub payment_method: PaymentMethod,
    pub shipping_address: ResolvedAddress,
    #[serde(default)]
    pub buyer_note: Option<String>,
    pub placed_at: DateTime<Utc>,
}

/// Data for OrderStatusChanged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChangedData {
    pub order_id: AggregateId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// Who made the change.
    pub actor_id: UserId,
    pub actor_role: ActorRole,
    /// Set when the order ships.
    #[serde(default)]
    pub tracking_number: Option<String>,
    pub changed_at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn order_id(&self) -> AggregateId {
        match self {
            OrderEvent::OrderPlaced(data) => data.order_id,
            OrderEvent::OrderStatusChanged(data) => data.order_id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(data) => data.placed_at,
            OrderEvent::OrderStatusChanged(data) => data.changed_at,
        }
    }

    /// Creates an OrderStatusChanged event stamped now.
    pub fn status_changed(
        order_id: AggregateId,
        from: OrderStatus,
        to: OrderStatus,
        actor_id: UserId,
        actor_role: ActorRole,
        tracking_number: Option<String>,
    ) -> Self {
        OrderEvent::OrderStatusChanged(StatusChangedData {
            order_id,
            from,
            to,
            actor_id,
            actor_role,
            tracking_number,
            changed_at: Utc::now(),
        })
    }
}
