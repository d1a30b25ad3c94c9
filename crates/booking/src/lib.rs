//! Booking authority.
//!
//! Owns reservation records and nothing else. This crate provides:
//! - `Reservation` and its status state machine
//! - `BookingRequest` validation
//! - the `ReservationRepository` port with in-memory and PostgreSQL adapters
//!
//! Driving a reservation through the cross-authority protocol is the job of
//! the `saga` crate.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod reservation;
pub mod validation;

pub use error::{RepositoryError, Result};
pub use memory::InMemoryReservationRepository;
pub use postgres::PostgresReservationRepository;
pub use repository::{ACTIVE_STATUSES, ReservationRepository};
pub use reservation::{Reservation, ReservationError, ReservationStatus};
pub use validation::{BookingRequest, MAX_STAY_NIGHTS, ValidatedRequest, ValidationError};
