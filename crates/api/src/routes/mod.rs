//! HTTP route handlers.

pub mod bookings;
pub mod extract;
pub mod ops;
pub mod rooms;
