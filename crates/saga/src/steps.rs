//! Booking saga step and remote operation names.

/// The saga type identifier used on spans.
pub const SAGA_TYPE: &str = "BookingSaga";

/// Step name: Validate the incoming request.
pub const STEP_VALIDATE: &str = "validate";

/// Step name: Check local reservations for overlapping dates.
pub const STEP_CHECK_CONFLICTS: &str = "check_conflicts";

/// Step name: Ask the inventory authority for a room.
pub const STEP_AUTO_SELECT: &str = "auto_select";

/// Step name: Persist the reservation as PENDING.
pub const STEP_RESERVE: &str = "reserve";

/// Step name: Confirm availability with the inventory authority.
pub const STEP_CONFIRM: &str = "confirm";

/// Step name: Move the reservation to CONFIRMED.
pub const STEP_COMMIT: &str = "commit";

/// Step name: Bump the room's booking counter.
pub const STEP_INCREMENT: &str = "increment";

/// Step name: Release the inventory hold and cancel the reservation.
pub const STEP_COMPENSATE: &str = "compensate";

/// Remote operation: ranked room recommendations.
pub const OP_RECOMMEND: &str = "recommend_rooms";

/// Remote operation: confirm availability for an attempt.
pub const OP_CONFIRM: &str = "confirm_availability";

/// Remote operation: release an attempt.
pub const OP_RELEASE: &str = "release";

/// Remote operation: count a completed booking.
pub const OP_INCREMENT: &str = "increment_times_booked";
