//! Projection processor for feeding events to projections.

use event_store::{EventEnvelope, EventStore};
use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};

/// Replays events from an event store into registered projections.
///
/// Each projection has a checkpoint: the sequence of the last stored event
/// it was handed. Catch-up reads only the log past the lowest checkpoint
/// and skips, per projection, what that projection already saw. Runs are
/// serialized, so two callers refreshing the read side at the same time
/// never deliver an event twice.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Box<dyn Projection>>,
    checkpoints: Mutex<Vec<u64>>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            checkpoints: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&mut self, projection: Box<dyn Projection>) {
        self.projections.push(projection);
        self.checkpoints.get_mut().push(0);
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Name and position of every registered projection.
    pub async fn positions(&self) -> Vec<(&'static str, ProjectionPosition)> {
        let checkpoints = self.checkpoints.lock().await.clone();
        let mut positions = Vec::with_capacity(self.projections.len());
        for (projection, last_sequence) in self.projections.iter().zip(checkpoints) {
            let position = ProjectionPosition {
                last_sequence,
                ..projection.position().await
            };
            positions.push((projection.name(), position));
        }
        positions
    }

    /// Hands each projection the stored events past its checkpoint.
    ///
    /// Returns the number of deliveries made.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<u64> {
        let mut checkpoints = self.checkpoints.lock().await;
        self.catch_up(&mut checkpoints).await
    }

    async fn catch_up(&self, checkpoints: &mut [u64]) -> Result<u64> {
        let from = checkpoints.iter().copied().min().unwrap_or_default();
        let mut stream = self.store.stream_events_after(from).await?;
        let mut read: u64 = 0;
        let mut delivered: u64 = 0;

        while let Some(result) = stream.next().await {
            let recorded = result?;
            read += 1;

            for (projection, checkpoint) in self.projections.iter().zip(checkpoints.iter_mut()) {
                if recorded.sequence > *checkpoint {
                    projection.handle(&recorded.envelope).await?;
                    *checkpoint = recorded.sequence;
                    delivered += 1;
                }
            }
        }

        if delivered > 0 {
            metrics::counter!("projections_events_processed").increment(delivered);
            tracing::debug!(from, events = read, delivered, "catch-up complete");
        }

        Ok(delivered)
    }

    /// Delivers a single event to all registered projections.
    ///
    /// Checkpoints are left alone; use it for events that never reach the store.
    #[tracing::instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub async fn process_event(&self, event: &EventEnvelope) -> Result<()> {
        for projection in &self.projections {
            projection.handle(event).await?;
        }
        Ok(())
    }

    /// Resets every projection and replays the whole store.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<u64> {
        let mut checkpoints = self.checkpoints.lock().await;
        for (projection, checkpoint) in self.projections.iter().zip(checkpoints.iter_mut()) {
            projection.reset().await?;
            *checkpoint = 0;
        }
        let delivered = self.catch_up(&mut checkpoints).await?;
        tracing::info!(projections = self.projections.len(), "projections rebuilt");
        Ok(delivered)
    }
}
