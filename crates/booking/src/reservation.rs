//! Reservation record and its status state machine.

use chrono::{DateTime, Utc};
use common::{AttemptToken, DateRange, HolderId, ReservationId, RoomId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The status of a reservation in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Confirmed ──► Cancelled   (holder cancels)
///           └──► Cancelled                 (saga compensation)
/// ```
///
/// Records are never created `Confirmed` and never move backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Reserved locally, awaiting confirmation from the inventory authority.
    #[default]
    Pending,

    /// The inventory authority confirmed the stay.
    Confirmed,

    /// Compensated or cancelled by the holder (terminal state).
    Cancelled,
}

impl ReservationStatus {
    /// Returns true if the reservation can be confirmed in this status.
    pub fn can_confirm(&self) -> bool {
        matches!(self, ReservationStatus::Pending)
    }

    /// Returns true if the reservation can be cancelled in this status.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending | ReservationStatus::Confirmed
        )
    }

    /// Returns true if the reservation still occupies its dates.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Cancelled)
    }

    /// Returns the status name as stored and displayed.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = ReservationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ReservationStatus::Pending),
            "CONFIRMED" => Ok(ReservationStatus::Confirmed),
            "CANCELLED" => Ok(ReservationStatus::Cancelled),
            other => Err(ReservationError::UnknownStatus(other.to_string())),
        }
    }
}

/// Errors raised by reservation state changes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReservationError {
    #[error("Invalid status transition: cannot {action} from {current} status")]
    InvalidStateTransition {
        current: ReservationStatus,
        action: &'static str,
    },

    #[error("Unknown reservation status: {0}")]
    UnknownStatus(String),
}

/// A booking authority reservation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    id: ReservationId,
    holder: HolderId,
    room_id: RoomId,
    dates: DateRange,
    status: ReservationStatus,
    attempt: AttemptToken,
    created_at: DateTime<Utc>,
    version: i64,
}

impl Reservation {
    /// Creates a new reservation in `Pending`, the only status a record may
    /// start in, under a freshly minted attempt token.
    pub fn pending(
        holder: HolderId,
        room_id: RoomId,
        dates: DateRange,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReservationId::new(),
            holder,
            room_id,
            dates,
            status: ReservationStatus::Pending,
            attempt: AttemptToken::generate(),
            created_at,
            version: 1,
        }
    }

    /// Rebuilds a stored record. Used by persistence adapters and seed data.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: ReservationId,
        holder: HolderId,
        room_id: RoomId,
        dates: DateRange,
        status: ReservationStatus,
        attempt: AttemptToken,
        created_at: DateTime<Utc>,
        version: i64,
    ) -> Self {
        Self {
            id,
            holder,
            room_id,
            dates,
            status,
            attempt,
            created_at,
            version,
        }
    }

    pub fn id(&self) -> ReservationId {
        self.id
    }

    pub fn holder(&self) -> &HolderId {
        &self.holder
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn dates(&self) -> DateRange {
        self.dates
    }

    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    /// Token this record's stay was confirmed under at the inventory
    /// authority.
    pub fn attempt(&self) -> &AttemptToken {
        &self.attempt
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Version last read from storage; updates are compare-and-set on it.
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn is_held_by(&self, holder: &HolderId) -> bool {
        &self.holder == holder
    }

    /// Whether this record blocks `dates` on its room.
    pub fn conflicts_with(&self, dates: &DateRange) -> bool {
        self.status.is_active() && self.dates.overlaps(dates)
    }

    pub fn confirm(&mut self) -> Result<(), ReservationError> {
        if !self.status.can_confirm() {
            return Err(ReservationError::InvalidStateTransition {
                current: self.status,
                action: "confirm",
            });
        }
        self.status = ReservationStatus::Confirmed;
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), ReservationError> {
        if !self.status.can_cancel() {
            return Err(ReservationError::InvalidStateTransition {
                current: self.status,
                action: "cancel",
            });
        }
        self.status = ReservationStatus::Cancelled;
        Ok(())
    }

    pub(crate) fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }
}
