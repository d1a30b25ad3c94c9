//! Stay date ranges and the overlap policy shared by both authorities.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a range would not satisfy `start < end`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid date range: start {start} must be before end {end}")]
pub struct InvalidDateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// A stay from `start` (check-in) to `end` (check-out).
///
/// Construction enforces `start < end`, including on deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeParts", into = "RangeParts")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Serialize, Deserialize)]
struct RangeParts {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RangeParts> for DateRange {
    type Error = InvalidDateRange;

    fn try_from(parts: RangeParts) -> Result<Self, Self::Error> {
        DateRange::new(parts.start, parts.end)
    }
}

impl From<DateRange> for RangeParts {
    fn from(range: DateRange) -> Self {
        RangeParts {
            start: range.start,
            end: range.end,
        }
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidDateRange> {
        if start >= end {
            return Err(InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of nights in the stay.
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Whether two stays conflict. See [`overlaps`].
    pub fn overlaps(&self, other: &DateRange) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Returns true unless one range ends strictly before the other begins.
///
/// Both boundary dates count as occupied: a stay checking out on the 12th
/// conflicts with one checking in on the 12th. This is the conservative
/// policy used by both authorities, not an off-by-one.
pub fn overlaps(
    start_a: NaiveDate,
    end_a: NaiveDate,
    start_b: NaiveDate,
    end_b: NaiveDate,
) -> bool {
    !(end_a < start_b || start_a > end_b)
}
