//! Checkout orchestration for the marketplace.
//!
//! A checkout reads the buyer's cart, prices it per seller, resolves the
//! shipping address and places one pending order per seller in a single
//! atomic write:
//! 1. Reject an empty cart
//! 2. Freeze listing prices and titles from the catalog
//! 3. Resolve the address, payment method and discount, collecting every problem
//! 4. Place all orders, or none
//! 5. Remove the checked-out lines from the cart

pub mod coordinator;
pub mod error;
pub mod request;
pub mod services;

pub use coordinator::CheckoutCoordinator;
pub use error::{CheckoutError, Result};
pub use request::{CheckoutReceipt, CheckoutRequest};
pub use services::{
    AddressBook, CartItem, CartStore, InMemoryAddressBook, InMemoryCartStore,
    InMemoryListingCatalog, Listing, ListingCatalog, MAX_LINE_QUANTITY,
};
