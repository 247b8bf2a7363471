//! Route handlers, grouped by resource.

pub mod addresses;
pub mod carts;
pub mod checkout;
pub mod health;
pub mod listings;
pub mod metrics;
pub mod orders;
pub mod shortlists;

use crate::error::ApiError;

/// Parses a path or query id, naming the parameter on failure.
pub(crate) fn parse_id<T, E: std::fmt::Display>(
    raw: &str,
    name: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, ApiError> {
    parse(raw).map_err(|e| ApiError::BadRequest(format!("Invalid {name}: {e}")))
}
