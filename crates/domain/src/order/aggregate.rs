//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::address::ResolvedAddress;
use crate::aggregate::Aggregate;
use crate::money::Money;
use crate::pricing::{PriceBreakdown, subtotal_of};

use super::{
    ActorRole, OrderError, OrderEvent, OrderLine, OrderStatus, PaymentMethod, PlaceOrder,
    events::{OrderPlacedData, StatusChangedData},
};

/// Order aggregate root.
///
/// Holds one seller's goods from one checkout. The priced figures and the
/// buyer address are frozen when the order is placed; afterwards only the
/// status (and the tracking number on shipping) changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Order {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    buyer_id: Option<UserId>,
    seller_id: Option<UserId>,
    status: OrderStatus,
    lines: Vec<OrderLine>,
    pricing: PriceBreakdown,
    payment_method: Option<PaymentMethod>,
    shipping_address: Option<ResolvedAddress>,
    buyer_note: Option<String>,
    tracking_number: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            OrderEvent::OrderPlaced(data) => self.apply_order_placed(data),
            OrderEvent::OrderStatusChanged(data) => self.apply_status_changed(data),
        }
    }
}

// Query methods
impl Order {
    pub fn buyer_id(&self) -> Option<UserId> {
        self.buyer_id
    }

    pub fn seller_id(&self) -> Option<UserId> {
        self.seller_id
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    /// Sum of line quantities.
    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    pub fn pricing(&self) -> &PriceBreakdown {
        &self.pricing
    }

    pub fn total_price(&self) -> Money {
        self.pricing.total
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn shipping_address(&self) -> Option<&ResolvedAddress> {
        self.shipping_address.as_ref()
    }

    pub fn buyer_note(&self) -> Option<&str> {
        self.buyer_note.as_deref()
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The role `user_id` plays on this order, if any.
    ///
    /// A user who is both buyer and seller acts as the seller.
    pub fn role_of(&self, user_id: UserId) -> Option<ActorRole> {
        if self.seller_id == Some(user_id) {
            Some(ActorRole::Seller)
        } else if self.buyer_id == Some(user_id) {
            Some(ActorRole::Buyer)
        } else {
            None
        }
    }

    /// Returns true if `user_id` is the buyer and the goods have arrived.
    pub fn can_review(&self, user_id: UserId) -> bool {
        self.buyer_id == Some(user_id) && self.status.is_reviewable()
    }

    /// Statuses `user_id` may move this order to next.
    pub fn available_actions(&self, user_id: UserId) -> Vec<OrderStatus> {
        self.role_of(user_id)
            .map(|role| self.status.allowed_targets(role))
            .unwrap_or_default()
    }
}

// Command methods (return events)
impl Order {
    /// Places a new order from a checkout.
    pub fn place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, OrderError> {
        if self.id.is_some() {
            return Err(OrderError::AlreadyPlaced);
        }

        if cmd.lines.is_empty() {
            return Err(OrderError::NoLines);
        }

        if let Some(line) = cmd.lines.iter().find(|line| line.quantity == 0) {
            return Err(OrderError::InvalidQuantity {
                listing_id: line.listing_id,
            });
        }

        if subtotal_of(&cmd.lines) != Some(cmd.pricing.subtotal) || !cmd.pricing.is_consistent() {
            return Err(OrderError::PricingMismatch);
        }

        Ok(vec![OrderEvent::OrderPlaced(OrderPlacedData {
            order_id: cmd.order_id,
            buyer_id: cmd.buyer_id,
            seller_id: cmd.seller_id,
            lines: cmd.lines.clone(),
            pricing: cmd.pricing,
            payment_method: cmd.payment_method,
            shipping_address: cmd.shipping_address.clone(),
            buyer_note: cmd.buyer_note.clone(),
            placed_at: Utc::now(),
        })])
    }

    /// Moves the order to `to` on behalf of `actor_id`.
    pub fn transition(
        &self,
        to: OrderStatus,
        actor_id: UserId,
        tracking_number: Option<String>,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let order_id = self.id.ok_or(OrderError::NotPlaced)?;

        let role = self
            .role_of(actor_id)
            .ok_or(OrderError::NotParticipant { user_id: actor_id })?;

        if !self.status.can_transition(to, role) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to,
                role,
            });
        }

        // Only shipping carries a tracking number.
        let tracking_number = tracking_number
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && to == OrderStatus::Shipped);

        Ok(vec![OrderEvent::status_changed(
            order_id,
            self.status,
            to,
            actor_id,
            role,
            tracking_number,
        )])
    }
}

// Apply event helpers
impl Order {
    fn apply_order_placed(&mut self, data: OrderPlacedData) {
        self.id = Some(data.order_id);
        self.buyer_id = Some(data.buyer_id);
        self.seller_id = Some(data.seller_id);
        self.status = OrderStatus::Pending;
        self.lines = data.lines;
        self.pricing = data.pricing;
        self.payment_method = Some(data.payment_method);
        self.shipping_address = Some(data.shipping_address);
        self.buyer_note = data.buyer_note;
        self.created_at = Some(data.placed_at);
        self.updated_at = Some(data.placed_at);
    }

    fn apply_status_changed(&mut self, data: StatusChangedData) {
        self.status = data.to;
        if data.tracking_number.is_some() {
            self.tracking_number = data.tracking_number;
        }
        self.updated_at = Some(data.changed_at);
    }
}
