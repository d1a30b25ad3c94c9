//! Booking saga error types.

use booking::{RepositoryError, ValidationError};
use common::{DateRange, RoomId};
use thiserror::Error;

use crate::client::RemoteError;
use crate::resilience::ResilienceError;

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    BadRequest,
    Conflict,
    NotFound,
    Unavailable,
    Internal,
}

/// Errors that can come out of a booking operation.
#[derive(Debug, Error)]
pub enum BookingError {
    /// The request failed validation; nothing was stored or sent.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// An active local reservation already covers some of the dates.
    #[error("Room {room_id} is already booked for overlapping dates ({dates})")]
    Conflict { room_id: RoomId, dates: DateRange },

    /// Auto-selection found no room that can take the stay.
    #[error("No available rooms for {0}")]
    NoCapacity(DateRange),

    /// The inventory authority declined the stay.
    #[error("Room {0} is not available for the selected dates")]
    NotAvailable(RoomId),

    /// The inventory authority could not be reached.
    #[error("Service temporarily unavailable, please try again later")]
    ServiceUnavailable,

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BookingError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BookingError::Validation(_) => ErrorCategory::BadRequest,
            BookingError::Conflict { .. }
            | BookingError::NoCapacity(_)
            | BookingError::NotAvailable(_) => ErrorCategory::Conflict,
            BookingError::NotFound(_) => ErrorCategory::NotFound,
            BookingError::ServiceUnavailable => ErrorCategory::Unavailable,
            BookingError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Short label used as the `reason` on failure metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "validation",
            BookingError::Conflict { .. } => "conflict",
            BookingError::NoCapacity(_) => "no_capacity",
            BookingError::NotAvailable(_) => "not_available",
            BookingError::ServiceUnavailable => "service_unavailable",
            BookingError::NotFound(_) => "not_found",
            BookingError::Internal(_) => "internal",
        }
    }

    pub(crate) fn booking_not_found() -> Self {
        BookingError::NotFound("Booking not found".to_string())
    }
}

impl From<RepositoryError> for BookingError {
    fn from(err: RepositoryError) -> Self {
        BookingError::Internal(err.to_string())
    }
}

impl From<ResilienceError<RemoteError>> for BookingError {
    fn from(err: ResilienceError<RemoteError>) -> Self {
        match err {
            ResilienceError::Rejected {
                error: RemoteError::RoomNotFound(id),
                ..
            } => BookingError::NotFound(format!("Room not found: {id}")),
            ResilienceError::Rejected { error, .. } => BookingError::Internal(error.to_string()),
            _ => BookingError::ServiceUnavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            BookingError::Validation(ValidationError::MissingDates).category(),
            ErrorCategory::BadRequest
        );
        assert_eq!(
            BookingError::NotAvailable(RoomId::new(1)).category(),
            ErrorCategory::Conflict
        );
        assert_eq!(
            BookingError::ServiceUnavailable.category(),
            ErrorCategory::Unavailable
        );
        assert_eq!(
            BookingError::booking_not_found().category(),
            ErrorCategory::NotFound
        );
    }

    #[test]
    fn test_remote_failures_map_to_unavailable() {
        let err: BookingError = ResilienceError::<RemoteError>::CircuitOpen {
            operation: "confirm_availability",
        }
        .into();
        assert!(matches!(err, BookingError::ServiceUnavailable));

        let err: BookingError = ResilienceError::Exhausted {
            operation: "confirm_availability",
            attempts: 3,
            last: RemoteError::Unreachable("reset".into()),
        }
        .into();
        assert!(matches!(err, BookingError::ServiceUnavailable));
    }

    #[test]
    fn test_unknown_room_maps_to_not_found() {
        let err: BookingError = ResilienceError::Rejected {
            operation: "confirm_availability",
            error: RemoteError::RoomNotFound(RoomId::new(4)),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert_eq!(err.to_string(), "Room not found: 4");
    }
}
