//! Collaborator ports the checkout reads from, with in-memory implementations.

pub mod addresses;
pub mod cart;
pub mod listings;

pub use addresses::{AddressBook, InMemoryAddressBook};
pub use cart::{CartItem, CartStore, InMemoryCartStore, MAX_LINE_QUANTITY};
pub use listings::{InMemoryListingCatalog, Listing, ListingCatalog};
