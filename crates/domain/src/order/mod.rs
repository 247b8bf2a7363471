//! Order aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use commands::{ChangeOrderStatus, PlaceOrder};
pub use events::{OrderEvent, OrderPlacedData, StatusChangedData};
pub use service::{IDEMPOTENCY_KEY_METADATA, OrderService};
pub use state::{ActorRole, OrderStatus, TRANSITIONS, Transition, UnknownStatus};
pub use value_objects::{OrderLine, PaymentMethod, UnsupportedPaymentMethod};

use common::{ListingId, UserId};
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The order stream already holds a placed order.
    #[error("Order already placed")]
    AlreadyPlaced,

    /// The command targets an order that was never placed.
    #[error("Order has not been placed")]
    NotPlaced,

    /// Order has no lines.
    #[error("Order has no lines")]
    NoLines,

    /// A line has a zero quantity.
    #[error("Invalid quantity for listing {listing_id} (must be greater than 0)")]
    InvalidQuantity { listing_id: ListingId },

    /// The frozen figures do not add up.
    #[error("Pricing does not match the order lines")]
    PricingMismatch,

    /// The transition is not in the table for this role.
    #[error("Invalid transition: {role} cannot move order from {from} to {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
        role: ActorRole,
    },

    /// The user is neither the buyer nor the seller.
    #[error("User {user_id} is not a participant of this order")]
    NotParticipant { user_id: UserId },
}
