//! Read model views.

pub mod order_board;
pub mod status_timeline;

pub use order_board::{OrderBoardView, OrderFilter, OrderSummary, StatusFilter, StatusTab};
pub use status_timeline::{StatusTimelineView, TimelineEntry};
