//! Booking request validation.
//!
//! Runs before anything is persisted or sent over the wire. Checks are
//! applied in a fixed order so the first violated rule is the one reported.

use chrono::NaiveDate;
use common::{DateRange, RoomId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest stay that can be booked in one request.
pub const MAX_STAY_NIGHTS: i64 = 30;

/// A booking request as it arrives from a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(default)]
    pub room_id: Option<RoomId>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub auto_select: bool,
}

impl BookingRequest {
    pub fn for_room(room_id: impl Into<RoomId>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            room_id: Some(room_id.into()),
            start_date: Some(start),
            end_date: Some(end),
            auto_select: false,
        }
    }

    pub fn auto_select(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            room_id: None,
            start_date: Some(start),
            end_date: Some(end),
            auto_select: true,
        }
    }

    /// Checks the request against `today` and returns its validated form.
    pub fn validate(&self, today: NaiveDate) -> Result<ValidatedRequest, ValidationError> {
        if self.room_id.is_none() && !self.auto_select {
            return Err(ValidationError::MissingRoom);
        }

        let (start, end) = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(ValidationError::MissingDates),
        };

        if start > end {
            return Err(ValidationError::StartAfterEnd { start, end });
        }
        if start < today {
            return Err(ValidationError::StartInPast { start, today });
        }
        if start == end {
            return Err(ValidationError::SameDay(start));
        }

        let dates = DateRange::new(start, end).map_err(|_| ValidationError::SameDay(start))?;
        if dates.nights() > MAX_STAY_NIGHTS {
            return Err(ValidationError::TooLong {
                nights: dates.nights(),
            });
        }

        Ok(ValidatedRequest {
            room_id: self.room_id,
            dates,
            auto_select: self.auto_select,
        })
    }
}

/// A request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedRequest {
    /// Present unless the caller asked for auto-selection only.
    pub room_id: Option<RoomId>,
    pub dates: DateRange,
    pub auto_select: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Room ID is required")]
    MissingRoom,

    #[error("Start date and end date are required")]
    MissingDates,

    #[error("Start date {start} cannot be after end date {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },

    #[error("Start date {start} cannot be in the past (today is {today})")]
    StartInPast { start: NaiveDate, today: NaiveDate },

    #[error("Start date and end date cannot be the same day ({0})")]
    SameDay(NaiveDate),

    #[error("Booking cannot exceed {MAX_STAY_NIGHTS} nights (requested {nights})")]
    TooLong { nights: i64 },
}
