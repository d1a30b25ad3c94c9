use common::ReservationId;
use thiserror::Error;

/// Errors raised by reservation persistence.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The stored record moved on since the caller read it.
    #[error(
        "Concurrency conflict for reservation {reservation_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        reservation_id: ReservationId,
        expected: i64,
        actual: i64,
    },

    /// No record with this id.
    #[error("Reservation not found: {0}")]
    NotFound(ReservationId),

    /// A record with this id already exists.
    #[error("Reservation already exists: {0}")]
    Duplicate(ReservationId),

    /// A stored row could not be turned back into a reservation.
    #[error("Corrupt reservation row: {0}")]
    CorruptRow(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
