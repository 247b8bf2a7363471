//! Command handling infrastructure.

use std::collections::HashMap;
use std::marker::PhantomData;

use common::AggregateId;
use event_store::{AppendOptions, EventEnvelope, EventStore, StreamAppend, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    pub new_version: Version,
}

/// An intention to change one aggregate.
pub trait Command: Send + Sync {
    type Aggregate: Aggregate;

    fn aggregate_id(&self) -> AggregateId;
}

/// Loads aggregates, runs commands against them and persists the resulting
/// events with optimistic concurrency.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rebuilds an aggregate from the store. Unknown ids yield a default instance.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let events = self.store.get_events_for_aggregate(aggregate_id).await?;
        Ok(A::replay(&events)?)
    }

    /// Loads an aggregate, returning `None` if it has no history.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    /// Executes a command and persists the resulting events.
    ///
    /// `command_fn` sees the freshly loaded state. The append expects the
    /// version that state was loaded at, so a writer that got in between
    /// makes this call fail with [`DomainError::ConcurrentModification`].
    pub async fn execute<F, E>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, E>,
        DomainError: From<E>,
    {
        let mut aggregate = self.load(aggregate_id).await?;
        let current_version = aggregate.version();

        let events = command_fn(&aggregate)?;

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events: vec![],
                new_version: current_version,
            });
        }

        let envelopes = Self::build_envelopes(aggregate_id, current_version, &events)?;
        let new_version = self
            .store
            .append(envelopes, AppendOptions::expect_version(current_version))
            .await?;

        aggregate.apply_events(events.iter().cloned());
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    /// Creates several new aggregates in one atomic append.
    ///
    /// Either every stream is written or none is; a stream that already
    /// exists fails the whole batch.
    pub async fn create_many(
        &self,
        creations: Vec<(AggregateId, Vec<A::Event>)>,
    ) -> Result<Vec<CommandResult<A>>, DomainError> {
        self.create_many_with_metadata(creations, &HashMap::new()).await
    }

    /// Like [`create_many`](Self::create_many), stamping `metadata` on every event written.
    pub async fn create_many_with_metadata(
        &self,
        creations: Vec<(AggregateId, Vec<A::Event>)>,
        metadata: &HashMap<String, serde_json::Value>,
    ) -> Result<Vec<CommandResult<A>>, DomainError> {
        let mut batch = Vec::with_capacity(creations.len());
        for (aggregate_id, events) in &creations {
            let mut envelopes = Self::build_envelopes(*aggregate_id, Version::initial(), events)?;
            for envelope in &mut envelopes {
                envelope.metadata.extend(metadata.clone());
            }
            batch.push(StreamAppend::new(envelopes, AppendOptions::expect_new()));
        }

        let versions = self.store.append_batch(batch).await?;

        Ok(creations
            .into_iter()
            .zip(versions)
            .map(|((_, events), new_version)| {
                let mut aggregate = A::default();
                aggregate.apply_events(events.iter().cloned());
                aggregate.set_version(new_version);
                CommandResult {
                    aggregate,
                    events,
                    new_version,
                }
            })
            .collect())
    }

    fn build_envelopes(
        aggregate_id: AggregateId,
        current_version: Version,
        events: &[A::Event],
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let mut version = current_version;
        events
            .iter()
            .map(|event| -> Result<EventEnvelope, DomainError> {
                version = version.next();
                Ok(event.to_envelope(aggregate_id, A::aggregate_type(), version)?)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_store::InMemoryEventStore;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum CounterEvent {
        Opened { id: AggregateId, label: String },
        Bumped { by: i32 },
    }

    impl DomainEvent for CounterEvent {
        fn event_type(&self) -> &'static str {
            match self {
                CounterEvent::Opened { .. } => "CounterOpened",
                CounterEvent::Bumped { .. } => "CounterBumped",
            }
        }
    }

    #[derive(Debug, Default)]
    struct Counter {
        id: Option<AggregateId>,
        label: String,
        value: i32,
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("negative bump: {0}")]
    struct NegativeBump(i32);

    impl From<NegativeBump> for DomainError {
        fn from(e: NegativeBump) -> Self {
            DomainError::InvalidCommand(e.to_string())
        }
    }

    impl Aggregate for Counter {
        type Event = CounterEvent;
        type Error = NegativeBump;

        fn aggregate_type() -> &'static str {
            "Counter"
        }

        fn id(&self) -> Option<AggregateId> {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                CounterEvent::Opened { id, label } => {
                    self.id = Some(id);
                    self.label = label;
                }
                CounterEvent::Bumped { by } => self.value += by,
            }
        }
    }

    fn open(id: AggregateId) -> Vec<CounterEvent> {
        vec![CounterEvent::Opened {
            id,
            label: "hits".to_string(),
        }]
    }

    fn bump(_counter: &Counter, by: i32) -> Result<Vec<CounterEvent>, NegativeBump> {
        if by < 0 {
            Err(NegativeBump(by))
        } else {
            Ok(vec![CounterEvent::Bumped { by }])
        }
    }

    #[tokio::test]
    async fn test_execute_creates_then_updates() {
        let handler: CommandHandler<_, Counter> = CommandHandler::new(InMemoryEventStore::new());
        let id = AggregateId::new();

        let created = handler
            .execute(id, |_| Ok::<_, NegativeBump>(open(id)))
            .await
            .unwrap();
        assert_eq!(created.new_version, Version::first());
        assert_eq!(created.aggregate.label, "hits");

        let updated = handler.execute(id, |c| bump(c, 4)).await.unwrap();
        assert_eq!(updated.new_version, Version::new(2));
        assert_eq!(updated.aggregate.value, 4);
    }

    #[tokio::test]
    async fn test_rejected_command_writes_nothing() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store.clone());

        let result = handler.execute(AggregateId::new(), |c| bump(c, -1)).await;
        assert!(matches!(result, Err(DomainError::InvalidCommand(_))));
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_events_returns_without_persisting() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store.clone());

        let result = handler
            .execute(AggregateId::new(), |_| Ok::<_, NegativeBump>(vec![]))
            .await
            .unwrap();

        assert!(result.events.is_empty());
        assert_eq!(result.new_version, Version::initial());
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn test_load_existing() {
        let handler: CommandHandler<_, Counter> = CommandHandler::new(InMemoryEventStore::new());
        let id = AggregateId::new();
        assert!(handler.load_existing(id).await.unwrap().is_none());

        handler
            .execute(id, |_| Ok::<_, NegativeBump>(open(id)))
            .await
            .unwrap();
        let loaded = handler.load_existing(id).await.unwrap().unwrap();
        assert_eq!(loaded.version(), Version::first());
    }

    #[tokio::test]
    async fn test_create_many_is_atomic() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store.clone());
        let existing = AggregateId::new();
        handler
            .execute(existing, |_| Ok::<_, NegativeBump>(open(existing)))
            .await
            .unwrap();

        let fresh = AggregateId::new();
        let result = handler
            .create_many(vec![(fresh, open(fresh)), (existing, open(existing))])
            .await;

        assert!(matches!(
            result,
            Err(DomainError::ConcurrentModification { .. })
        ));
        assert!(handler.load_existing(fresh).await.unwrap().is_none());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_many_returns_each_aggregate() {
        let handler: CommandHandler<_, Counter> = CommandHandler::new(InMemoryEventStore::new());
        let a = AggregateId::new();
        let b = AggregateId::new();

        let results = handler
            .create_many(vec![(a, open(a)), (b, open(b))])
            .await
            .unwrap();

        let ids: Vec<_> = results.iter().map(|r| r.aggregate.id()).collect();
        assert_eq!(ids, vec![Some(a), Some(b)]);
        assert!(results.iter().all(|r| r.new_version == Version::first()));
    }

    #[tokio::test]
    async fn test_create_many_stamps_metadata() {
        let store = InMemoryEventStore::new();
        let handler: CommandHandler<_, Counter> = CommandHandler::new(store.clone());
        let a = AggregateId::new();
        let b = AggregateId::new();
        let metadata = HashMap::from([("batch".to_string(), serde_json::json!("b-1"))]);

        handler
            .create_many_with_metadata(vec![(a, open(a)), (b, open(b))], &metadata)
            .await
            .unwrap();

        let tagged = store.get_events_by_metadata("batch", "b-1").await.unwrap();
        let ids: Vec<_> = tagged.iter().map(|e| e.aggregate_id).collect();
        assert_eq!(ids, vec![a, b]);
    }
}
