//! Shared building blocks for the booking and inventory authorities.
//!
//! Both authorities speak in the same identifiers and date ranges, and both
//! need the same overlap policy, so those live here rather than in either side.

pub mod clock;
pub mod dates;
pub mod locks;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dates::{DateRange, InvalidDateRange, overlaps};
pub use locks::KeyedLocks;
pub use types::{AttemptToken, HolderId, ReservationId, RoomId};
