//! Per-room record of confirmed stays.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use common::{AttemptToken, DateRange, RoomId};
use serde::Serialize;
use tokio::sync::RwLock;

/// A stay the inventory authority has committed to.
///
/// Holds from a `confirm` carry the attempt token that created them so a
/// later `release` can find them; seeded stays carry none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StayHold {
    pub dates: DateRange,
    pub token: Option<AttemptToken>,
}

/// Stay holds keyed by room.
///
/// Callers serialize check-then-hold sequences with the engine's room locks;
/// the calendar itself only guards its map. Holds stay until released or
/// pruned with [`StayCalendar::prune_ended`].
#[derive(Debug, Clone, Default)]
pub struct StayCalendar {
    holds: Arc<RwLock<HashMap<RoomId, Vec<StayHold>>>>,
}

impl StayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no hold on `room_id` overlaps `dates`.
    pub async fn is_free(&self, room_id: RoomId, dates: &DateRange) -> bool {
        self.holds
            .read()
            .await
            .get(&room_id)
            .is_none_or(|holds| !holds.iter().any(|h| h.dates.overlaps(dates)))
    }

    /// Whether `token` already holds a stay on `room_id`.
    pub async fn is_held_by(&self, room_id: RoomId, token: &AttemptToken) -> bool {
        self.holds
            .read()
            .await
            .get(&room_id)
            .is_some_and(|holds| holds.iter().any(|h| h.token.as_ref() == Some(token)))
    }

    pub async fn hold(&self, room_id: RoomId, dates: DateRange, token: Option<AttemptToken>) {
        self.holds
            .write()
            .await
            .entry(room_id)
            .or_default()
            .push(StayHold { dates, token });
    }

    /// Drops the hold `token` created on `room_id`. Returns whether one existed.
    pub async fn release(&self, room_id: RoomId, token: &AttemptToken) -> bool {
        let mut holds = self.holds.write().await;
        let Some(room_holds) = holds.get_mut(&room_id) else {
            return false;
        };
        let before = room_holds.len();
        room_holds.retain(|h| h.token.as_ref() != Some(token));
        before != room_holds.len()
    }

    /// Drops every hold whose stay ended before `today`. Returns how many
    /// were dropped.
    pub async fn prune_ended(&self, today: NaiveDate) -> usize {
        let mut holds = self.holds.write().await;
        let mut pruned = 0;
        holds.retain(|_, room_holds| {
            let before = room_holds.len();
            room_holds.retain(|h| h.dates.end() >= today);
            pruned += before - room_holds.len();
            !room_holds.is_empty()
        });
        pruned
    }

    /// Holds on `room_id`, ordered by start date.
    pub async fn holds(&self, room_id: RoomId) -> Vec<StayHold> {
        let mut holds = self
            .holds
            .read()
            .await
            .get(&room_id)
            .cloned()
            .unwrap_or_default();
        holds.sort_by_key(|h| h.dates.start());
        holds
    }
}
