//! Core aggregate and domain event traits.

use common::AggregateId;
use event_store::{EventEnvelope, Version};
use serde::{Serialize, de::DeserializeOwned};

/// A fact recorded against an aggregate, named in the past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Name stored alongside the payload; used for filtering by type.
    fn event_type(&self) -> &'static str;

    /// Wraps the event for the store at `version`.
    fn to_envelope(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        version: Version,
    ) -> Result<EventEnvelope, serde_json::Error> {
        EventEnvelope::from_payload(aggregate_id, aggregate_type, version, self.event_type(), self)
    }

    /// Reads the event back out of a stored envelope.
    fn from_envelope(envelope: &EventEnvelope) -> Result<Self, serde_json::Error> {
        serde_json::from_value(envelope.payload.clone())
    }
}

/// An event-sourced entity.
///
/// State is rebuilt by replaying events through [`Aggregate::apply`]. Command
/// methods inspect the state and return new events; they never mutate.
pub trait Aggregate: Default + Send + Sync + Sized {
    type Event: DomainEvent;

    type Error: std::error::Error + Send + Sync;

    /// Aggregate type name written to every envelope.
    fn aggregate_type() -> &'static str;

    /// `None` until the first event has been applied.
    fn id(&self) -> Option<AggregateId>;

    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    /// Folds one event into the state. Must not fail.
    fn apply(&mut self, event: Self::Event);

    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }

    /// Rebuilds an aggregate from its stored history.
    fn replay(envelopes: &[EventEnvelope]) -> Result<Self, serde_json::Error> {
        let mut aggregate = Self::default();
        for envelope in envelopes {
            aggregate.apply(Self::Event::from_envelope(envelope)?);
            aggregate.set_version(envelope.version);
        }
        Ok(aggregate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum TallyEvent {
        Opened { id: AggregateId },
        Counted { by: u32 },
    }

    impl DomainEvent for TallyEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TallyEvent::Opened { .. } => "TallyOpened",
                TallyEvent::Counted { .. } => "TallyCounted",
            }
        }
    }

    #[derive(Debug, Default)]
    struct Tally {
        id: Option<AggregateId>,
        count: u32,
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("tally error")]
    struct TallyError;

    impl Aggregate for Tally {
        type Event = TallyEvent;
        type Error = TallyError;

        fn aggregate_type() -> &'static str {
            "Tally"
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
                TallyEvent::Opened { id } => self.id = Some(id),
                TallyEvent::Counted { by } => self.count += by,
            }
        }
    }

    #[test]
    fn test_apply_events() {
        let id = AggregateId::new();
        let mut tally = Tally::default();
        tally.apply_events([TallyEvent::Opened { id }, TallyEvent::Counted { by: 3 }]);

        assert_eq!(tally.id(), Some(id));
        assert_eq!(tally.count, 3);
    }

    #[test]
    fn test_replay_from_envelopes() {
        let id = AggregateId::new();
        let envelopes = [
            TallyEvent::Opened { id },
            TallyEvent::Counted { by: 2 },
            TallyEvent::Counted { by: 5 },
        ]
        .iter()
        .zip(1..)
        .map(|(event, v)| event.to_envelope(id, "Tally", Version::new(v)).unwrap())
        .collect::<Vec<_>>();

        assert_eq!(envelopes[1].event_type, "TallyCounted");

        let tally = Tally::replay(&envelopes).unwrap();
        assert_eq!(tally.count, 7);
        assert_eq!(tally.version(), Version::new(3));
    }
}
