//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use service::ServiceError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client (malformed path/body).
    BadRequest(String),
    /// Service-layer error.
    Service(ServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Service(err) => service_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn service_error_to_response(err: ServiceError) -> (StatusCode, String) {
    match &err {
        ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        ServiceError::ItemNotFound(_) | ServiceError::ReservationNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        ServiceError::OutOfStock { .. }
        | ServiceError::DuplicateItem(_)
        | ServiceError::NoLongerActive { .. }
        | ServiceError::AlreadyConfirmed(_) => (StatusCode::CONFLICT, err.to_string()),
        ServiceError::Expired(_) => (StatusCode::GONE, err.to_string()),
        ServiceError::Storage(e) => {
            tracing::error!(error = %e, "storage error");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}
