//! Query side of the order lifecycle.
//!
//! - [`Projection`] folds stored events into a read model
//! - [`ReadModel`] exposes what a view holds
//! - [`ProjectionProcessor`] replays the event store into registered projections
//! - [`OrderBoardView`] lists orders by status; [`StatusTimelineView`] keeps per-order history

pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

#[cfg(test)]
mod test_support;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition, decode_order_event};
pub use read_model::ReadModel;
pub use views::{
    OrderBoardView, OrderFilter, OrderSummary, StatusFilter, StatusTab, StatusTimelineView,
    TimelineEntry,
};
