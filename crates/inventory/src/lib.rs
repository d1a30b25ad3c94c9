//! Inventory authority.
//!
//! Owns rooms, their availability and their booking counters. Exposes the
//! [`AvailabilityEngine`], which the booking side reaches through a remote
//! contract and never through shared storage.

pub mod calendar;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod repository;
pub mod room;

pub use calendar::{StayCalendar, StayHold};
pub use engine::AvailabilityEngine;
pub use error::{InventoryError, Result};
pub use ledger::{DEFAULT_LEDGER_TTL, IdempotencyLedger, InMemoryIdempotencyLedger};
pub use repository::{InMemoryRoomRepository, RoomRepository};
pub use room::{NewRoom, Room};
