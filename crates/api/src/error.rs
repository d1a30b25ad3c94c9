//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use inventory::InventoryError;
use saga::{BookingError, ErrorCategory};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No caller identity on a holder-scoped route.
    Unauthorized,
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Booking saga error.
    Booking(BookingError),
    /// Inventory authority error.
    Inventory(InventoryError),
    /// Internal server error.
    Internal(String),
}

const INTERNAL_MESSAGE: &str = "Internal server error";

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "User not authenticated".to_string(),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Booking(err) => booking_error_to_response(err),
            ApiError::Inventory(err) => inventory_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn booking_error_to_response(err: BookingError) -> (StatusCode, String) {
    let status = match err.category() {
        ErrorCategory::BadRequest => StatusCode::BAD_REQUEST,
        ErrorCategory::Conflict => StatusCode::CONFLICT,
        ErrorCategory::NotFound => StatusCode::NOT_FOUND,
        ErrorCategory::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCategory::Internal => {
            tracing::error!(error = %err, "booking failed internally");
            return (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string());
        }
    };
    (status, err.to_string())
}

fn inventory_error_to_response(err: InventoryError) -> (StatusCode, String) {
    match &err {
        InventoryError::RoomNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        InventoryError::InvalidRoom(_) => (StatusCode::BAD_REQUEST, err.to_string()),
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        ApiError::Booking(err)
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        ApiError::Inventory(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::RoomId;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_booking_categories_map_to_status_codes() {
        assert_eq!(
            status_of(BookingError::Validation(booking::ValidationError::MissingDates).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(BookingError::NotAvailable(RoomId::new(1)).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(BookingError::NotFound("Booking not found".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(BookingError::ServiceUnavailable.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(BookingError::Internal("db down".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_inventory_errors_map_to_status_codes() {
        assert_eq!(
            status_of(InventoryError::RoomNotFound(RoomId::new(3)).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(InventoryError::InvalidRoom("empty".into()).into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_unauthorized() {
        assert_eq!(status_of(ApiError::Unauthorized), StatusCode::UNAUTHORIZED);
    }
}
