//! Listing catalog seeding endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::{Listing, ListingCatalog};
use common::{ListingId, UserId};
use domain::Money;
use event_store::EventStore;
use serde::Deserialize;

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateListingRequest {
    pub seller_id: UserId,
    #[serde(default)]
    pub title: String,
    pub price: Money,
}

/// POST /listings: add a listing to the catalog.
#[tracing::instrument(skip(state, body))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<CreateListingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Listing>), ApiError> {
    let Json(req) = body?;
    let listing = Listing::new(req.seller_id, req.title.trim(), req.price);

    state.checkout.listings().upsert(listing.clone()).await?;
    tracing::info!(listing_id = %listing.id, seller_id = %listing.seller_id, "listing created");

    Ok((StatusCode::CREATED, Json(listing)))
}

/// GET /listings/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Listing>, ApiError> {
    let listing_id = parse_id(&id, "listing id", ListingId::parse)?;
    state
        .checkout
        .listings()
        .get(listing_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Listing {id} not found")))
}
