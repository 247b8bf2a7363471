//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::{DomainError, FieldErrors, OrderError, ShortlistError};
use projections::ProjectionError;
use serde::Serialize;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Malformed path or query parameter.
    BadRequest(String),
    /// The request body could not be read as the expected type.
    Body { status: StatusCode, message: String },
    Domain(DomainError),
    Checkout(CheckoutError),
    Shortlist(ShortlistError),
    /// Internal server error. The detail is logged, never returned.
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "FieldErrors::is_empty")]
    fields: FieldErrors,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, fields) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, FieldErrors::new()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, FieldErrors::new()),
            ApiError::Body { status, message } => (status, message, FieldErrors::new()),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Shortlist(err) => shortlist_error_to_response(err),
            ApiError::Internal(msg) => internal(msg),
        };

        let body = ErrorBody {
            error: message,
            fields,
        };
        (status, axum::Json(body)).into_response()
    }
}

fn internal(detail: String) -> (StatusCode, String, FieldErrors) {
    tracing::error!(error = %detail, "internal server error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal server error".to_string(),
        FieldErrors::new(),
    )
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String, FieldErrors) {
    let status = match &err {
        DomainError::Order(order_err) => match order_err {
            OrderError::InvalidTransition { .. } | OrderError::AlreadyPlaced => {
                StatusCode::CONFLICT
            }
            OrderError::NotParticipant { .. } => StatusCode::FORBIDDEN,
            OrderError::NotPlaced => StatusCode::NOT_FOUND,
            OrderError::NoLines
            | OrderError::InvalidQuantity { .. }
            | OrderError::PricingMismatch => StatusCode::UNPROCESSABLE_ENTITY,
        },
        DomainError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::ConcurrentModification { .. } => StatusCode::CONFLICT,
        DomainError::InvalidCommand(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::EventStore(_) | DomainError::Serialization(_) => {
            return internal(err.to_string());
        }
    };
    (status, err.to_string(), FieldErrors::new())
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String, FieldErrors) {
    match err {
        CheckoutError::Domain(inner) => domain_error_to_response(inner),
        CheckoutError::Unavailable(detail) => internal(detail),
        other => {
            let status = if matches!(other, CheckoutError::CartItemNotFound(_)) {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            (status, other.to_string(), other.field_errors())
        }
    }
}

fn shortlist_error_to_response(err: ShortlistError) -> (StatusCode, String, FieldErrors) {
    let status = match &err {
        ShortlistError::Full { .. } => StatusCode::CONFLICT,
        ShortlistError::UnknownKind(_) => StatusCode::NOT_FOUND,
        ShortlistError::Storage(_) | ShortlistError::Serialization(_) => {
            return internal(err.to_string());
        }
    };
    (status, err.to_string(), FieldErrors::new())
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<ShortlistError> for ApiError {
    fn from(err: ShortlistError) -> Self {
        ApiError::Shortlist(err)
    }
}

impl From<ProjectionError> for ApiError {
    fn from(err: ProjectionError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
