//! Booking saga across the booking and inventory authorities.
//!
//! The booking flow follows these steps:
//! 1. Validate the request
//! 2. Check local reservations for overlapping dates (per-room lock)
//! 3. Optionally auto-select a room from the inventory authority
//! 4. Persist the reservation as PENDING
//! 5. Confirm availability remotely, behind retry, timeout and a circuit breaker
//! 6. Commit to CONFIRMED and count the booking
//!
//! If anything fails after step 4, the remote attempt is released and the
//! reservation cancelled.

pub mod client;
pub mod coordinator;
pub mod error;
pub mod resilience;
pub mod steps;

pub use client::{InventoryClient, LocalInventoryClient, RemoteError};
pub use coordinator::BookingSaga;
pub use error::{BookingError, ErrorCategory};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, ResilienceError, ResiliencePolicy,
    RetryConfig, Transient,
};
