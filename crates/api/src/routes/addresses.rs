//! Address book endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::AddressBook;
use common::{AddressId, UserId};
use domain::Address;
use event_store::EventStore;
use serde::Deserialize;

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// Body of `POST /users/{user_id}/addresses`. Missing text fields are reported
/// per field rather than as a malformed body.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateAddressRequest {
    pub full_name: String,
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub city: String,
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
    pub is_default: bool,
}

/// GET /users/{user_id}/addresses
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Address>>, ApiError> {
    let user_id = parse_id(&user_id, "user id", UserId::parse)?;
    Ok(Json(state.checkout.addresses().addresses_for(user_id).await?))
}

/// POST /users/{user_id}/addresses: save an address to the user's book.
#[tracing::instrument(skip(state, body))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(user_id): Path<String>,
    body: Result<Json<CreateAddressRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Address>), ApiError> {
    let user_id = parse_id(&user_id, "user id", UserId::parse)?;
    let Json(req) = body?;

    let address = Address {
        id: AddressId::new(),
        user_id,
        full_name: req.full_name.trim().to_string(),
        address_line_1: req.address_line_1.trim().to_string(),
        address_line_2: req.address_line_2,
        city: req.city.trim().to_string(),
        region: req.region,
        postal_code: req.postal_code.trim().to_string(),
        country: req.country.trim().to_string(),
        phone: req.phone,
        is_default: req.is_default,
    };

    state.checkout.addresses().add(address.clone()).await?;
    Ok((StatusCode::CREATED, Json(address)))
}
