use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{AggregateId, EventEnvelope, EventStoreError, Result, Version};

/// Options for appending events to a stream.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Expected current version of the stream. `None` skips the check.
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects the stream to be at `version`.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Expects the stream not to exist yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// Events for one stream inside a batch append.
#[derive(Debug, Clone)]
pub struct StreamAppend {
    pub events: Vec<EventEnvelope>,
    pub options: AppendOptions,
}

impl StreamAppend {
    pub fn new(events: Vec<EventEnvelope>, options: AppendOptions) -> Self {
        Self { events, options }
    }
}

/// A stream of events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// An event read back with its position in the global log.
///
/// Sequences grow with commit order but may skip values.
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub sequence: u64,
    pub envelope: EventEnvelope,
}

/// A stream of events with their global positions.
pub type RecordedEventStream = Pin<Box<dyn Stream<Item = Result<RecordedEvent>> + Send>>;

/// Persistence for aggregate event streams.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends events to a single stream.
    ///
    /// All events are written or none are. Fails with `ConcurrencyConflict`
    /// when `options.expected_version` does not match the stream.
    /// Returns the stream version after the append.
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version>;

    /// Appends to several streams as one unit.
    ///
    /// Every stream's version check passes and every event is written, or the
    /// store is left exactly as it was.
    async fn append_batch(&self, batch: Vec<StreamAppend>) -> Result<Vec<Version>>;

    /// Retrieves all events for a stream in version order.
    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>>;

    /// Retrieves events of one type across all streams, oldest first.
    async fn get_events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>>;

    /// Retrieves events whose metadata holds `key` with the string `value`, oldest first.
    async fn get_events_by_metadata(&self, key: &str, value: &str) -> Result<Vec<EventEnvelope>>;

    /// Streams every event in insertion order.
    async fn stream_all_events(&self) -> Result<EventStream>;

    /// Streams events whose sequence is greater than `after`, in sequence order.
    ///
    /// An event that becomes visible never has a lower sequence than one
    /// already returned, so a reader can resume from the last sequence it saw.
    async fn stream_events_after(&self, after: u64) -> Result<RecordedEventStream>;

    /// Current version of a stream, or `None` if it has no events.
    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;
}

/// Convenience methods available on every event store.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Appends a single event.
    async fn append_event(&self, event: EventEnvelope, options: AppendOptions) -> Result<Version> {
        self.append(vec![event], options).await
    }

    /// Returns true if the stream has at least one event.
    async fn aggregate_exists(&self, aggregate_id: AggregateId) -> Result<bool> {
        Ok(self.get_aggregate_version(aggregate_id).await?.is_some())
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Checks that `events` form one contiguous segment of one stream.
///
/// Returns the stream id of the segment.
pub fn validate_events_for_append(events: &[EventEnvelope]) -> Result<AggregateId> {
    let Some(first) = events.first() else {
        return Err(EventStoreError::InvalidAppend(
            "cannot append an empty event list".to_string(),
        ));
    };

    let mut expected_version = first.version;
    for event in events.iter().skip(1) {
        if event.aggregate_id != first.aggregate_id {
            return Err(EventStoreError::InvalidAppend(
                "all events must belong to the same aggregate".to_string(),
            ));
        }
        if event.aggregate_type != first.aggregate_type {
            return Err(EventStoreError::InvalidAppend(
                "all events must have the same aggregate type".to_string(),
            ));
        }
        expected_version = expected_version.next();
        if event.version != expected_version {
            return Err(EventStoreError::InvalidAppend(format!(
                "event versions must be sequential: expected {}, got {}",
                expected_version, event.version
            )));
        }
    }

    Ok(first.aggregate_id)
}

/// Checks a whole batch: every segment valid, no stream appearing twice.
pub fn validate_batch(batch: &[StreamAppend]) -> Result<Vec<AggregateId>> {
    let mut ids = Vec::with_capacity(batch.len());
    for stream in batch {
        let id = validate_events_for_append(&stream.events)?;
        if ids.contains(&id) {
            return Err(EventStoreError::InvalidAppend(format!(
                "aggregate {id} appears more than once in the batch"
            )));
        }
        ids.push(id);
    }
    Ok(ids)
}
