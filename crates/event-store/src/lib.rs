//! Append-only event storage.
//!
//! Orders are never updated in place: every status change is a new event in
//! the order's stream, guarded by the stream version. Several streams can be
//! appended in one all-or-nothing batch, which is what checkout relies on.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use store::{
    AppendOptions, EventStore, EventStoreExt, EventStream, RecordedEvent, RecordedEventStream,
    StreamAppend,
};
