//! Read model trait for query-side views.

use async_trait::async_trait;

/// A query-side view kept up to date by a projection.
#[async_trait]
pub trait ReadModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of entries currently held.
    async fn count(&self) -> usize;
}
