//! Domain layer for the marketplace order core.
//!
//! This crate provides:
//! - Aggregate and command-handling abstractions over the event store
//! - Money and the checkout pricing calculator
//! - Address book resolution for checkout
//! - The order aggregate with its table-driven status state machine
//! - Comparison and favourite shortlists

pub mod address;
pub mod aggregate;
pub mod command;
pub mod error;
pub mod money;
pub mod order;
pub mod pricing;
pub mod shortlist;
pub mod validation;

pub use address::{
    Address, AddressError, AddressSelection, ManualAddress, ResolvedAddress, default_address,
    resolve as resolve_address, split_full_name,
};
pub use aggregate::{Aggregate, DomainEvent};
pub use command::{Command, CommandHandler, CommandResult};
pub use error::DomainError;
pub use money::{Money, MoneyRangeError};
pub use order::{
    ActorRole, ChangeOrderStatus, IDEMPOTENCY_KEY_METADATA, Order, OrderError, OrderEvent,
    OrderLine, OrderPlacedData, OrderService, OrderStatus, PaymentMethod, PlaceOrder,
    StatusChangedData, TRANSITIONS, Transition, UnknownStatus, UnsupportedPaymentMethod,
};
pub use pricing::{
    FlatRateShipping, FreeShipping, PriceBreakdown, PricedLine, PricingCalculator, PricingError,
    ShippingPolicy, VAT_RATE_BASIS_POINTS, subtotal_of,
};
pub use shortlist::{
    COMPARE_CAPACITY, InMemoryShortlistStore, Shortlist, ShortlistError, ShortlistKind,
    ShortlistService, ShortlistStore,
};
pub use validation::{FieldError, FieldErrorCode, FieldErrors};
