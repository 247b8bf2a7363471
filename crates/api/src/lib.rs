//! HTTP API for the marketplace order core.
//!
//! Exposes checkout, order status changes and the order read models as REST
//! endpoints, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use domain::PricingCalculator;
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, ConfigError, LogFormat};
pub use error::ApiError;
pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/checkout", post(routes::checkout::place::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", post(routes::orders::change_status::<S>))
        .route("/orders/{id}/timeline", get(routes::orders::timeline::<S>))
        .route(
            "/orders/{id}/review-eligibility",
            get(routes::orders::review_eligibility::<S>),
        )
        .route("/orders/{id}/events", get(routes::orders::events::<S>))
        .route("/order-statuses", get(routes::orders::status_tabs::<S>))
        .route("/listings", post(routes::listings::create::<S>))
        .route("/listings/{id}", get(routes::listings::get::<S>))
        .route("/carts/{buyer_id}", get(routes::carts::list::<S>))
        .route("/carts/{buyer_id}/items", post(routes::carts::add_item::<S>))
        .route(
            "/carts/{buyer_id}/items/{item_id}",
            patch(routes::carts::set_quantity::<S>).delete(routes::carts::remove_item::<S>),
        )
        .route(
            "/users/{user_id}/addresses",
            get(routes::addresses::list::<S>).post(routes::addresses::create::<S>),
        )
        .route(
            "/users/{user_id}/shortlists/{kind}",
            get(routes::shortlists::get::<S>).post(routes::shortlists::add::<S>),
        )
        .route(
            "/users/{user_id}/shortlists/{kind}/{listing_id}",
            axum::routing::delete(routes::shortlists::remove::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over `event_store` with in-memory collaborators.
pub fn create_default_state<S: EventStore + Clone + 'static>(
    event_store: S,
    pricing: PricingCalculator,
) -> Arc<AppState<S>> {
    Arc::new(AppState::new(event_store, pricing))
}
