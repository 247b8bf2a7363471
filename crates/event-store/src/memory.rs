use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Version,
    store::{
        AppendOptions, EventStore, EventStream, RecordedEvent, RecordedEventStream, StreamAppend,
        validate_batch, validate_events_for_append,
    },
};

/// In-memory event store.
///
/// Used by tests and by the API server when no database is configured.
/// All writes happen under one lock, so a batch is atomic. An event's
/// sequence is its 1-based position in the log.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<EventEnvelope>>>,
    fail_on_append: Arc<AtomicBool>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following append fail with `Unavailable` until reset.
    pub fn set_fail_on_append(&self, fail: bool) {
        self.fail_on_append.store(fail, Ordering::SeqCst);
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    fn current_version(events: &[EventEnvelope], aggregate_id: AggregateId) -> Version {
        events
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max()
            .unwrap_or_default()
    }

    /// Version checks for one stream against the current contents.
    fn check_stream(
        events: &[EventEnvelope],
        aggregate_id: AggregateId,
        segment: &[EventEnvelope],
        options: &AppendOptions,
    ) -> Result<()> {
        let current = Self::current_version(events, aggregate_id);

        if let Some(expected) = options.expected_version
            && current != expected
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current,
            });
        }

        // Mirrors the unique (aggregate_id, version) constraint of the SQL store.
        if let Some(first) = segment.first()
            && first.version != current.next()
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(current),
                actual: current,
            });
        }

        Ok(())
    }

    fn check_available(&self) -> Result<()> {
        if self.fail_on_append.load(Ordering::SeqCst) {
            return Err(EventStoreError::Unavailable(
                "in-memory store configured to fail".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        let aggregate_id = validate_events_for_append(&events)?;
        self.check_available()?;

        let mut store = self.events.write().await;
        Self::check_stream(&store, aggregate_id, &events, &options)?;

        let last_version = events.last().map(|e| e.version).unwrap_or_default();
        store.extend(events);
        Ok(last_version)
    }

    async fn append_batch(&self, batch: Vec<StreamAppend>) -> Result<Vec<Version>> {
        let ids = validate_batch(&batch)?;
        self.check_available()?;

        let mut store = self.events.write().await;
        for (stream, aggregate_id) in batch.iter().zip(&ids) {
            Self::check_stream(&store, *aggregate_id, &stream.events, &stream.options)?;
        }

        let mut versions = Vec::with_capacity(batch.len());
        for stream in batch {
            versions.push(stream.events.last().map(|e| e.version).unwrap_or_default());
            store.extend(stream.events);
        }
        Ok(versions)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let store = self.events.read().await;
        let mut events: Vec<_> = store
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn get_events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>> {
        let store = self.events.read().await;
        Ok(store
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect())
    }

    async fn get_events_by_metadata(&self, key: &str, value: &str) -> Result<Vec<EventEnvelope>> {
        let store = self.events.read().await;
        Ok(store
            .iter()
            .filter(|e| e.metadata.get(key).and_then(|v| v.as_str()) == Some(value))
            .cloned()
            .collect())
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.events.read().await.clone();
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn stream_events_after(&self, after: u64) -> Result<RecordedEventStream> {
        use futures_util::stream;

        let skip = usize::try_from(after).unwrap_or(usize::MAX);
        let tail: Vec<RecordedEvent> = self
            .events
            .read()
            .await
            .iter()
            .enumerate()
            .skip(skip)
            .map(|(index, envelope)| RecordedEvent {
                sequence: index as u64 + 1,
                envelope: envelope.clone(),
            })
            .collect();
        Ok(Box::pin(stream::iter(tail.into_iter().map(Ok))))
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let store = self.events.read().await;
        Ok(store
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max())
    }
}
