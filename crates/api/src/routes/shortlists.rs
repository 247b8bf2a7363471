//! Comparison and favourites list endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use common::{ListingId, UserId};
use domain::{Shortlist, ShortlistKind};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddToShortlistRequest {
    pub listing_id: ListingId,
}

#[derive(Debug, Serialize)]
pub struct ShortlistResponse {
    pub kind: ShortlistKind,
    pub items: Vec<ListingId>,
    /// Maximum size, absent for unbounded lists.
    pub capacity: Option<usize>,
}

impl From<Shortlist> for ShortlistResponse {
    fn from(list: Shortlist) -> Self {
        Self {
            kind: list.kind(),
            items: list.items().to_vec(),
            capacity: list.kind().capacity(),
        }
    }
}

fn owner_and_kind(user_id: &str, kind: &str) -> Result<(UserId, ShortlistKind), ApiError> {
    let owner = parse_id(user_id, "user id", UserId::parse)?;
    let kind = kind.parse::<ShortlistKind>()?;
    Ok((owner, kind))
}

/// GET /users/{user_id}/shortlists/{kind}
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((user_id, kind)): Path<(String, String)>,
) -> Result<Json<ShortlistResponse>, ApiError> {
    let (owner, kind) = owner_and_kind(&user_id, &kind)?;
    let list = state.shortlists.load(owner, kind).await?;
    Ok(Json(list.into()))
}

/// POST /users/{user_id}/shortlists/{kind}: add a listing; a full comparison list refuses.
#[tracing::instrument(skip(state, body))]
pub async fn add<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((user_id, kind)): Path<(String, String)>,
    body: Result<Json<AddToShortlistRequest>, JsonRejection>,
) -> Result<Json<ShortlistResponse>, ApiError> {
    let (owner, kind) = owner_and_kind(&user_id, &kind)?;
    let Json(req) = body?;
    let list = state.shortlists.add(owner, kind, req.listing_id).await?;
    Ok(Json(list.into()))
}

/// DELETE /users/{user_id}/shortlists/{kind}/{listing_id}
#[tracing::instrument(skip(state))]
pub async fn remove<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((user_id, kind, listing_id)): Path<(String, String, String)>,
) -> Result<Json<ShortlistResponse>, ApiError> {
    let (owner, kind) = owner_and_kind(&user_id, &kind)?;
    let listing_id = parse_id(&listing_id, "listing id", ListingId::parse)?;
    let list = state.shortlists.remove(owner, kind, listing_id).await?;
    Ok(Json(list.into()))
}
