//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::{CartItem, CartStore, ListingCatalog};
use common::{CartItemId, ListingId, UserId};
use event_store::EventStore;
use serde::Deserialize;

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddItemRequest {
    pub listing_id: ListingId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetQuantityRequest {
    pub quantity: u32,
}

/// GET /carts/{buyer_id}
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(buyer_id): Path<String>,
) -> Result<Json<Vec<CartItem>>, ApiError> {
    let buyer_id = parse_id(&buyer_id, "buyer id", UserId::parse)?;
    Ok(Json(state.checkout.carts().items(buyer_id).await?))
}

/// POST /carts/{buyer_id}/items: add a catalog listing to the cart.
#[tracing::instrument(skip(state, body))]
pub async fn add_item<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(buyer_id): Path<String>,
    body: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CartItem>), ApiError> {
    let buyer_id = parse_id(&buyer_id, "buyer id", UserId::parse)?;
    let Json(req) = body?;

    if state.checkout.listings().get(req.listing_id).await?.is_none() {
        return Err(ApiError::NotFound(format!(
            "Listing {} not found",
            req.listing_id
        )));
    }

    let item = state
        .checkout
        .carts()
        .add_item(buyer_id, req.listing_id, req.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PATCH /carts/{buyer_id}/items/{item_id}
#[tracing::instrument(skip(state, body))]
pub async fn set_quantity<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((buyer_id, item_id)): Path<(String, String)>,
    body: Result<Json<SetQuantityRequest>, JsonRejection>,
) -> Result<Json<CartItem>, ApiError> {
    let buyer_id = parse_id(&buyer_id, "buyer id", UserId::parse)?;
    let item_id = parse_id(&item_id, "cart item id", CartItemId::parse)?;
    let Json(req) = body?;

    let item = state
        .checkout
        .carts()
        .set_quantity(buyer_id, item_id, req.quantity)
        .await?;
    Ok(Json(item))
}

/// DELETE /carts/{buyer_id}/items/{item_id}
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((buyer_id, item_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let buyer_id = parse_id(&buyer_id, "buyer id", UserId::parse)?;
    let item_id = parse_id(&item_id, "cart item id", CartItemId::parse)?;

    state.checkout.carts().remove_item(buyer_id, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
