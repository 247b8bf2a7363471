//! Identifier types shared by every crate in the marketplace workspace.

mod types;

pub use types::{AddressId, AggregateId, CartItemId, ListingId, UserId};
