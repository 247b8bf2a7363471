//! Order lookup, status change and read-model endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use domain::{
    Aggregate, ChangeOrderStatus, Order, OrderLine, OrderStatus, PaymentMethod, PriceBreakdown,
    ResolvedAddress,
};
use event_store::EventStore;
use projections::{OrderFilter, OrderSummary, StatusFilter, StatusTab, TimelineEntry};
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

/// Body of `POST /orders/{id}/status`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusChangeRequest {
    pub status: OrderStatus,
    pub actor_id: UserId,
    #[serde(default)]
    pub expected_status: Option<OrderStatus>,
    #[serde(default)]
    pub tracking_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewerQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub buyer_id: Option<String>,
    pub seller_id: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub buyer_id: Option<UserId>,
    pub seller_id: Option<UserId>,
    pub status: OrderStatus,
    pub status_label: &'static str,
    pub lines: Vec<OrderLine>,
    pub quantity: u64,
    pub pricing: PriceBreakdown,
    pub payment_method: Option<PaymentMethod>,
    pub shipping_address: Option<ResolvedAddress>,
    pub buyer_note: Option<String>,
    pub tracking_number: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Statuses the viewing user may move the order to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_actions: Option<Vec<OrderStatus>>,
}

impl OrderResponse {
    pub fn from_order(order: &Order, viewer: Option<UserId>) -> Self {
        Self {
            id: order.id().map(|id| id.to_string()).unwrap_or_default(),
            buyer_id: order.buyer_id(),
            seller_id: order.seller_id(),
            status: order.status(),
            status_label: order.status().label(),
            lines: order.lines().to_vec(),
            quantity: order.total_quantity(),
            pricing: *order.pricing(),
            payment_method: order.payment_method(),
            shipping_address: order.shipping_address().cloned(),
            buyer_note: order.buyer_note().map(String::from),
            tracking_number: order.tracking_number().map(String::from),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
            available_actions: viewer.map(|user_id| order.available_actions(user_id)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewEligibilityResponse {
    pub order_id: String,
    pub user_id: UserId,
    pub can_review: bool,
}

/// Response type for event envelope data.
#[derive(Serialize)]
pub struct EventEnvelopeResponse {
    pub event_id: String,
    pub event_type: String,
    pub aggregate_id: String,
    pub version: i64,
    pub timestamp: String,
    pub payload: serde_json::Value,
}

// -- Handlers --

/// GET /orders/{id}: load an order, with the viewer's actions when `user_id` is given.
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_id(&id, "order id", AggregateId::parse)?;
    let viewer = optional_user(query.user_id.as_deref(), "user_id")?;

    let order = load_order(&state, order_id).await?;
    Ok(Json(OrderResponse::from_order(&order, viewer)))
}

/// GET /orders: order summaries from the board, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    let filter = order_filter(&query)?;
    state.refresh_read_models().await?;
    Ok(Json(state.order_board.list(&filter).await))
}

/// GET /order-statuses: status tabs with counts for the given party.
#[tracing::instrument(skip(state))]
pub async fn status_tabs<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<StatusTab>>, ApiError> {
    let filter = order_filter(&query)?;
    state.refresh_read_models().await?;
    Ok(Json(state.order_board.status_tabs(&filter).await))
}

/// POST /orders/{id}/status: move an order along the state machine.
#[tracing::instrument(skip(state, body))]
pub async fn change_status<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    body: Result<Json<StatusChangeRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_id(&id, "order id", AggregateId::parse)?;
    let Json(req) = body?;

    let mut cmd = ChangeOrderStatus::new(order_id, req.status, req.actor_id);
    if let Some(expected) = req.expected_status {
        cmd = cmd.expecting(expected);
    }
    if let Some(tracking_number) = req.tracking_number {
        cmd = cmd.with_tracking_number(tracking_number);
    }

    let order = state.order_service.change_status(cmd).await?;
    tracing::info!(
        order_id = %order_id,
        status = %order.status(),
        actor_id = %req.actor_id,
        "order status changed"
    );
    Ok(Json(OrderResponse::from_order(&order, Some(req.actor_id))))
}

/// GET /orders/{id}/timeline: every status the order went through.
#[tracing::instrument(skip(state))]
pub async fn timeline<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TimelineEntry>>, ApiError> {
    let order_id = parse_id(&id, "order id", AggregateId::parse)?;
    state.refresh_read_models().await?;
    state
        .timeline
        .get_timeline(order_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))
}

/// GET /orders/{id}/review-eligibility?user_id=: may this user review the goods.
#[tracing::instrument(skip(state))]
pub async fn review_eligibility<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<ReviewEligibilityResponse>, ApiError> {
    let order_id = parse_id(&id, "order id", AggregateId::parse)?;
    let user_id = optional_user(query.user_id.as_deref(), "user_id")?
        .ok_or_else(|| ApiError::BadRequest("Missing user_id".to_string()))?;

    let can_review = state.order_service.can_review(order_id, user_id).await?;
    Ok(Json(ReviewEligibilityResponse {
        order_id: order_id.to_string(),
        user_id,
        can_review,
    }))
}

/// GET /orders/{id}/events: list all events for an order aggregate.
#[tracing::instrument(skip(state))]
pub async fn events<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventEnvelopeResponse>>, ApiError> {
    let aggregate_id = parse_id(&id, "order id", AggregateId::parse)?;

    let envelopes = state
        .event_store
        .get_events_for_aggregate(aggregate_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    if envelopes.is_empty() {
        return Err(ApiError::NotFound(format!("Order {id} not found")));
    }

    let responses: Vec<EventEnvelopeResponse> = envelopes
        .into_iter()
        .map(|e| EventEnvelopeResponse {
            event_id: e.event_id.to_string(),
            event_type: e.event_type,
            aggregate_id: e.aggregate_id.to_string(),
            version: e.version.as_i64(),
            timestamp: e.timestamp.to_rfc3339(),
            payload: e.payload,
        })
        .collect();

    Ok(Json(responses))
}

async fn load_order<S: EventStore + Clone + 'static>(
    state: &AppState<S>,
    order_id: AggregateId,
) -> Result<Order, ApiError> {
    state
        .order_service
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {order_id} not found")))
}

fn optional_user(raw: Option<&str>, name: &str) -> Result<Option<UserId>, ApiError> {
    raw.filter(|s| !s.is_empty())
        .map(|s| parse_id(s, name, UserId::parse))
        .transpose()
}

fn order_filter(query: &ListQuery) -> Result<OrderFilter, ApiError> {
    let status: StatusFilter = query
        .status
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid status: {e}")))?;

    Ok(OrderFilter {
        status,
        buyer_id: optional_user(query.buyer_id.as_deref(), "buyer_id")?,
        seller_id: optional_user(query.seller_id.as_deref(), "seller_id")?,
    })
}
