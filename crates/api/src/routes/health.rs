//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use event_store::EventStore;
use projections::ReadModel;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub read_models: Vec<ReadModelHealth>,
}

#[derive(Serialize)]
pub struct ReadModelHealth {
    pub name: &'static str,
    pub entries: usize,
    pub events_processed: u64,
    pub last_sequence: u64,
}

/// GET /health: returns system health status and read-model progress.
pub async fn check<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<HealthResponse> {
    let positions = state.projection_processor.positions().await;
    let position_of = |name: &str| {
        positions
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, p)| *p)
            .unwrap_or_default()
    };

    let models: [&dyn ReadModel; 2] = [&state.order_board, &state.timeline];
    let mut read_models = Vec::with_capacity(models.len());
    for model in models {
        let entries = model.count().await;
        let position = position_of(model.name());
        metrics::gauge!("read_model_entries", "model" => model.name()).set(entries as f64);
        read_models.push(ReadModelHealth {
            name: model.name(),
            entries,
            events_processed: position.events_processed,
            last_sequence: position.last_sequence,
        });
    }

    Json(HealthResponse {
        status: "ok",
        read_models,
    })
}
