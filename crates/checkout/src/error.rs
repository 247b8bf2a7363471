//! Checkout error types.

use common::{AddressId, CartItemId, ListingId};
use domain::{DomainError, FieldError, FieldErrorCode, FieldErrors, PricingError};
use thiserror::Error;

use crate::services::cart::MAX_LINE_QUANTITY;

/// Errors that can occur while checking out or touching a collaborator.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// One or more input fields were rejected.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("cart is empty")]
    EmptyCart,

    #[error("address not found: {0}")]
    AddressNotFound(AddressId),

    #[error("unsupported payment method: {0}")]
    InvalidPaymentMethod(String),

    /// Cart lines whose listing no longer exists.
    #[error("listings no longer available: {}", join_ids(.0))]
    ListingUnavailable(Vec<ListingId>),

    #[error("cart item not found: {0}")]
    CartItemNotFound(CartItemId),

    #[error("quantity must be between 1 and {}", MAX_LINE_QUANTITY)]
    InvalidQuantity,

    /// The cart's amounts do not fit the money range.
    #[error("cart total is out of range: {0}")]
    Pricing(#[from] PricingError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// A collaborator could not be reached.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

fn join_ids(ids: &[ListingId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl CheckoutError {
    /// The field-level view of this error. Empty for infrastructure failures.
    pub fn field_errors(&self) -> FieldErrors {
        match self {
            CheckoutError::Validation(errors) => errors.clone(),
            CheckoutError::EmptyCart => FieldErrors::from(FieldError::new(
                "items",
                FieldErrorCode::Required,
                "cart is empty",
            )),
            CheckoutError::AddressNotFound(id) => FieldErrors::from(FieldError::new(
                "address_id",
                FieldErrorCode::NotFound,
                format!("address {id} not found"),
            )),
            CheckoutError::InvalidPaymentMethod(method) => FieldErrors::from(FieldError::new(
                "payment_method",
                FieldErrorCode::Unsupported,
                format!("payment method '{method}' is not supported"),
            )),
            CheckoutError::ListingUnavailable(ids) => ids
                .iter()
                .map(|id| {
                    FieldError::new(
                        "items",
                        FieldErrorCode::NotFound,
                        format!("listing {id} is no longer available"),
                    )
                })
                .fold(FieldErrors::new(), |mut errors, e| {
                    errors.push(e);
                    errors
                }),
            CheckoutError::CartItemNotFound(id) => FieldErrors::from(FieldError::new(
                "item_id",
                FieldErrorCode::NotFound,
                format!("cart item {id} not found"),
            )),
            CheckoutError::InvalidQuantity => FieldErrors::from(FieldError::new(
                "quantity",
                FieldErrorCode::Invalid,
                format!("quantity must be between 1 and {MAX_LINE_QUANTITY}"),
            )),
            CheckoutError::Pricing(_) => FieldErrors::from(FieldError::new(
                "items",
                FieldErrorCode::Invalid,
                "cart total is too large",
            )),
            CheckoutError::Domain(_) | CheckoutError::Unavailable(_) => FieldErrors::new(),
        }
    }

    /// Short label used for the failure metric.
    pub fn kind(&self) -> &'static str {
        match self {
            CheckoutError::Validation(_) => "validation",
            CheckoutError::EmptyCart => "empty_cart",
            CheckoutError::AddressNotFound(_) => "address_not_found",
            CheckoutError::InvalidPaymentMethod(_) => "invalid_payment_method",
            CheckoutError::ListingUnavailable(_) => "listing_unavailable",
            CheckoutError::CartItemNotFound(_) | CheckoutError::InvalidQuantity => "cart",
            CheckoutError::Pricing(_) => "pricing",
            CheckoutError::Domain(e) if e.is_persistence_failure() => "persistence",
            CheckoutError::Domain(_) => "domain",
            CheckoutError::Unavailable(_) => "unavailable",
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
