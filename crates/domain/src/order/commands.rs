//! Order commands.

use common::{AggregateId, UserId};

use crate::address::ResolvedAddress;
use crate::command::Command;
use crate::pricing::PriceBreakdown;

use super::{Order, OrderLine, OrderStatus, PaymentMethod};

/// Command to place a new order for one seller's goods.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// The order ID to create.
    pub order_id: AggregateId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub lines: Vec<OrderLine>,
    /// Figures computed over `lines`.
    pub pricing: PriceBreakdown,
    pub payment_method: PaymentMethod,
    pub shipping_address: ResolvedAddress,
    pub buyer_note: Option<String>,
}

impl Command for PlaceOrder {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}

/// Command to move an order to another status.
#[derive(Debug, Clone)]
pub struct ChangeOrderStatus {
    pub order_id: AggregateId,
    pub to: OrderStatus,
    pub actor_id: UserId,
    /// The status the caller last saw. A mismatch is a concurrent modification.
    pub expected_status: Option<OrderStatus>,
    pub tracking_number: Option<String>,
}

impl ChangeOrderStatus {
    pub fn new(order_id: AggregateId, to: OrderStatus, actor_id: UserId) -> Self {
        Self {
            order_id,
            to,
            actor_id,
            expected_status: None,
            tracking_number: None,
        }
    }

    pub fn expecting(mut self, status: OrderStatus) -> Self {
        self.expected_status = Some(status);
        self
    }

    pub fn with_tracking_number(mut self, tracking_number: impl Into<String>) -> Self {
        self.tracking_number = Some(tracking_number.into());
        self
    }
}

impl Command for ChangeOrderStatus {
    type Aggregate = Order;

    fn aggregate_id(&self) -> AggregateId {
        self.order_id
    }
}
