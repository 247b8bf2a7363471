//! Checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use checkout::CheckoutRequest;
use event_store::EventStore;
use serde::Serialize;

use super::orders::OrderResponse;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub orders: Vec<OrderResponse>,
    /// True when the idempotency key matched an earlier checkout.
    pub replayed: bool,
    /// False when the cart could not be emptied after placing the orders.
    pub cart_cleared: bool,
}

/// POST /checkout: turn the buyer's cart into one pending order per seller.
///
/// Answers `201 Created`, or `200 OK` when an idempotent retry returns the
/// orders of the earlier checkout.
#[tracing::instrument(skip(state, body))]
pub async fn place<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let Json(req) = body?;
    let buyer_id = req.buyer_id;

    let receipt = state.checkout.checkout(req).await?;
    let status = if receipt.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    let orders = receipt
        .orders
        .iter()
        .map(|order| OrderResponse::from_order(order, Some(buyer_id)))
        .collect();

    Ok((
        status,
        Json(CheckoutResponse {
            orders,
            replayed: receipt.replayed,
            cart_cleared: receipt.cart_cleared,
        }),
    ))
}
