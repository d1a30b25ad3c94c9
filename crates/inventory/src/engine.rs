use std::sync::Arc;

use chrono::NaiveDate;
use common::{AttemptToken, DateRange, KeyedLocks, RoomId};

use crate::calendar::{StayCalendar, StayHold};
use crate::error::{InventoryError, Result};
use crate::ledger::IdempotencyLedger;
use crate::repository::RoomRepository;
use crate::room::{NewRoom, Room};

/// The inventory authority's decision point for room availability.
///
/// `confirm` and `release` are idempotent per attempt token. Check-then-hold
/// sequences on one room are serialized; unrelated rooms proceed in parallel.
pub struct AvailabilityEngine {
    rooms: Arc<dyn RoomRepository>,
    ledger: Arc<dyn IdempotencyLedger>,
    calendar: StayCalendar,
    locks: KeyedLocks<RoomId>,
}

impl AvailabilityEngine {
    pub fn new(rooms: Arc<dyn RoomRepository>, ledger: Arc<dyn IdempotencyLedger>) -> Self {
        Self {
            rooms,
            ledger,
            calendar: StayCalendar::new(),
            locks: KeyedLocks::new(),
        }
    }

    /// Confirms that `room_id` can host `dates` for the attempt `token`.
    ///
    /// Returns `true` and records a stay hold when the room is free, `false`
    /// when it is flagged unavailable or already held for overlapping dates.
    /// A token that was already confirmed gets `true` without a second hold.
    #[tracing::instrument(skip(self, token), fields(token = %token))]
    pub async fn confirm(
        &self,
        room_id: RoomId,
        dates: DateRange,
        token: &AttemptToken,
    ) -> Result<bool> {
        if self.ledger.is_processed(token).await {
            metrics::counter!("inventory_confirm_total", "outcome" => "replayed").increment(1);
            tracing::debug!("attempt already confirmed");
            return Ok(true);
        }

        let room = self.require_room(room_id).await?;
        if !room.available {
            metrics::counter!("inventory_confirm_total", "outcome" => "room_unavailable")
                .increment(1);
            tracing::info!("room is flagged unavailable");
            return Ok(false);
        }

        let _guard = self.locks.lock(&room_id).await;

        // A duplicate delivery may have confirmed while we waited, or the
        // ledger marker may have expired while the hold is still in place.
        if self.ledger.is_processed(token).await || self.calendar.is_held_by(room_id, token).await
        {
            self.ledger.mark_processed(token).await;
            metrics::counter!("inventory_confirm_total", "outcome" => "replayed").increment(1);
            return Ok(true);
        }

        if !self.calendar.is_free(room_id, &dates).await {
            metrics::counter!("inventory_confirm_total", "outcome" => "conflict").increment(1);
            tracing::info!(%dates, "dates already held");
            return Ok(false);
        }

        self.calendar
            .hold(room_id, dates, Some(token.clone()))
            .await;
        self.ledger.mark_processed(token).await;

        metrics::counter!("inventory_confirm_total", "outcome" => "confirmed").increment(1);
        tracing::info!(%dates, "stay confirmed");
        Ok(true)
    }

    /// Undoes a confirmation made with `token`. Unknown tokens are a no-op.
    #[tracing::instrument(skip(self, token), fields(token = %token))]
    pub async fn release(&self, room_id: RoomId, token: &AttemptToken) -> Result<()> {
        if !self.ledger.is_processed(token).await {
            tracing::debug!("nothing to release");
            return Ok(());
        }

        let _guard = self.locks.lock(&room_id).await;
        self.ledger.remove(token).await;
        let released = self.calendar.release(room_id, token).await;

        tracing::info!(released, "attempt released");
        Ok(())
    }

    /// Adds one completed booking to the room's counter.
    #[tracing::instrument(skip(self))]
    pub async fn increment_times_booked(&self, room_id: RoomId) -> Result<Room> {
        let _guard = self.locks.lock(&room_id).await;
        let mut room = self.require_room(room_id).await?;
        room.times_booked += 1;
        self.rooms.update(&room).await?;

        tracing::debug!(times_booked = room.times_booked, "booking counted");
        Ok(room)
    }

    /// Ids of rooms that can host `dates`, least booked first, ties by id.
    #[tracing::instrument(skip(self))]
    pub async fn recommend_rooms(&self, dates: DateRange) -> Result<Vec<RoomId>> {
        let mut rooms = self.free_rooms(&dates).await?;
        rooms.sort_by_key(|r| (r.times_booked, r.id));
        Ok(rooms.into_iter().map(|r| r.id).collect())
    }

    /// Rooms that can host `dates`, ordered by id.
    #[tracing::instrument(skip(self))]
    pub async fn available_rooms(&self, dates: DateRange) -> Result<Vec<Room>> {
        self.free_rooms(&dates).await
    }

    pub async fn list_rooms(&self) -> Result<Vec<Room>> {
        self.rooms.list().await
    }

    pub async fn get_room(&self, room_id: RoomId) -> Result<Room> {
        self.require_room(room_id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_room(&self, room: NewRoom) -> Result<Room> {
        let room = self.rooms.insert(room).await?;
        tracing::info!(room_id = %room.id, number = %room.number, "room added");
        Ok(room)
    }

    /// Flags a room as offerable or not. Existing holds are kept.
    #[tracing::instrument(skip(self))]
    pub async fn set_available(&self, room_id: RoomId, available: bool) -> Result<Room> {
        let _guard = self.locks.lock(&room_id).await;
        let mut room = self.require_room(room_id).await?;
        room.available = available;
        self.rooms.update(&room).await?;
        Ok(room)
    }

    /// Records a stay that did not come through `confirm`, e.g. seed data.
    #[tracing::instrument(skip(self))]
    pub async fn record_stay(&self, room_id: RoomId, dates: DateRange) -> Result<()> {
        self.require_room(room_id).await?;
        let _guard = self.locks.lock(&room_id).await;
        self.calendar.hold(room_id, dates, None).await;
        Ok(())
    }

    /// Forgets stays that ended before `today`. A bookable request starts
    /// today or later, so such stays can no longer conflict.
    #[tracing::instrument(skip(self))]
    pub async fn prune_past_stays(&self, today: NaiveDate) -> usize {
        let pruned = self.calendar.prune_ended(today).await;
        if pruned > 0 {
            tracing::info!(pruned, "past stays pruned");
        }
        pruned
    }

    /// Current holds on a room, ordered by start date.
    pub async fn holds(&self, room_id: RoomId) -> Vec<StayHold> {
        self.calendar.holds(room_id).await
    }

    async fn require_room(&self, room_id: RoomId) -> Result<Room> {
        self.rooms
            .get(room_id)
            .await?
            .ok_or(InventoryError::RoomNotFound(room_id))
    }

    async fn free_rooms(&self, dates: &DateRange) -> Result<Vec<Room>> {
        let mut free = Vec::new();
        for room in self.rooms.list().await? {
            if room.available && self.calendar.is_free(room.id, dates).await {
                free.push(room);
            }
        }
        Ok(free)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryIdempotencyLedger;
    use crate::repository::InMemoryRoomRepository;
    use common::{Clock, ManualClock};
    use std::time::Duration;

    struct Fixture {
        engine: AvailabilityEngine,
        clock: Arc<ManualClock>,
    }

    async fn fixture(rooms: usize) -> Fixture {
        let clock = Arc::new(ManualClock::at_date(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        ));
        let ledger = InMemoryIdempotencyLedger::new(Duration::from_secs(3600), clock.clone());
        let engine = AvailabilityEngine::new(
            Arc::new(InMemoryRoomRepository::new()),
            Arc::new(ledger),
        );
        for n in 0..rooms {
            engine
                .add_room(NewRoom::new(1, format!("10{}", n + 1)))
                .await
                .unwrap();
        }
        Fixture { engine, clock }
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(start.parse().unwrap(), end.parse().unwrap()).unwrap()
    }

    fn r1() -> RoomId {
        RoomId::new(1)
    }

    #[tokio::test]
    async fn test_confirm_free_room_records_hold() {
        let f = fixture(1).await;
        let token = AttemptToken::new("t-1");

        let ok = f
            .engine
            .confirm(r1(), range("2025-03-10", "2025-03-12"), &token)
            .await
            .unwrap();

        assert!(ok);
        let holds = f.engine.holds(r1()).await;
        assert_eq!(holds.len(), 1);
        assert_eq!(holds[0].token, Some(token));
    }

    #[tokio::test]
    async fn test_confirm_is_idempotent_per_token() {
        let f = fixture(1).await;
        let token = AttemptToken::new("t-1");
        let dates = range("2025-03-10", "2025-03-12");

        assert!(f.engine.confirm(r1(), dates, &token).await.unwrap());
        assert!(f.engine.confirm(r1(), dates, &token).await.unwrap());

        assert_eq!(f.engine.holds(r1()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_replay_after_marker_expiry_keeps_single_hold() {
        let f = fixture(1).await;
        let token = AttemptToken::new("t-1");
        let dates = range("2025-03-10", "2025-03-12");

        assert!(f.engine.confirm(r1(), dates, &token).await.unwrap());
        f.clock.advance(Duration::from_secs(7200));
        assert!(f.engine.confirm(r1(), dates, &token).await.unwrap());

        assert_eq!(f.engine.holds(r1()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_confirm_is_refused() {
        let f = fixture(1).await;
        f.engine
            .record_stay(r1(), range("2025-03-11", "2025-03-14"))
            .await
            .unwrap();

        let ok = f
            .engine
            .confirm(r1(), range("2025-03-10", "2025-03-12"), &AttemptToken::new("t"))
            .await
            .unwrap();

        assert!(!ok);
        assert_eq!(f.engine.holds(r1()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_shared_boundary_day_conflicts() {
        let f = fixture(1).await;
        f.engine
            .record_stay(r1(), range("2025-03-10", "2025-03-12"))
            .await
            .unwrap();

        let ok = f
            .engine
            .confirm(r1(), range("2025-03-12", "2025-03-14"), &AttemptToken::new("t"))
            .await
            .unwrap();

        assert!(!ok);
    }

    #[tokio::test]
    async fn test_unavailable_room_is_refused() {
        let f = fixture(1).await;
        f.engine.set_available(r1(), false).await.unwrap();

        let ok = f
            .engine
            .confirm(r1(), range("2025-03-10", "2025-03-12"), &AttemptToken::new("t"))
            .await
            .unwrap();

        assert!(!ok);
        assert!(f.engine.holds(r1()).await.is_empty());
    }

    #[tokio::test]
    async fn test_confirm_missing_room() {
        let f = fixture(0).await;
        let result = f
            .engine
            .confirm(r1(), range("2025-03-10", "2025-03-12"), &AttemptToken::new("t"))
            .await;
        assert_eq!(result, Err(InventoryError::RoomNotFound(r1())));
    }

    #[tokio::test]
    async fn test_release_restores_prior_state() {
        let f = fixture(1).await;
        let token = AttemptToken::new("t-1");
        let dates = range("2025-03-10", "2025-03-12");
        let before = f.engine.get_room(r1()).await.unwrap();

        f.engine.confirm(r1(), dates, &token).await.unwrap();
        f.engine.release(r1(), &token).await.unwrap();

        assert!(f.engine.holds(r1()).await.is_empty());
        assert_eq!(f.engine.get_room(r1()).await.unwrap(), before);

        // Dates are bookable again by another attempt
        assert!(
            f.engine
                .confirm(r1(), dates, &AttemptToken::new("t-2"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_release_unknown_token_is_noop() {
        let f = fixture(1).await;
        f.engine
            .record_stay(r1(), range("2025-03-10", "2025-03-12"))
            .await
            .unwrap();

        f.engine.release(r1(), &AttemptToken::new("nope")).await.unwrap();
        f.engine.release(RoomId::new(99), &AttemptToken::new("nope")).await.unwrap();

        assert_eq!(f.engine.holds(r1()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_increment_times_booked() {
        let f = fixture(1).await;
        f.engine.increment_times_booked(r1()).await.unwrap();
        let room = f.engine.increment_times_booked(r1()).await.unwrap();
        assert_eq!(room.times_booked, 2);

        assert_eq!(
            f.engine.increment_times_booked(RoomId::new(42)).await,
            Err(InventoryError::RoomNotFound(RoomId::new(42)))
        );
    }

    #[tokio::test]
    async fn test_recommend_orders_by_times_booked_then_id() {
        let f = fixture(3).await;
        let dates = range("2025-03-10", "2025-03-12");
        f.engine.increment_times_booked(RoomId::new(1)).await.unwrap();
        f.engine.increment_times_booked(RoomId::new(1)).await.unwrap();
        f.engine.increment_times_booked(RoomId::new(3)).await.unwrap();

        let ids = f.engine.recommend_rooms(dates).await.unwrap();
        assert_eq!(ids, vec![RoomId::new(2), RoomId::new(3), RoomId::new(1)]);
    }

    #[tokio::test]
    async fn test_recommend_skips_held_and_unavailable_rooms() {
        let f = fixture(3).await;
        let dates = range("2025-03-10", "2025-03-12");
        f.engine
            .record_stay(RoomId::new(1), range("2025-03-11", "2025-03-13"))
            .await
            .unwrap();
        f.engine.set_available(RoomId::new(2), false).await.unwrap();

        assert_eq!(
            f.engine.recommend_rooms(dates).await.unwrap(),
            vec![RoomId::new(3)]
        );
        let available = f.engine.available_rooms(dates).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, RoomId::new(3));
    }

    #[tokio::test]
    async fn test_record_stay_requires_room() {
        let f = fixture(0).await;
        assert!(
            f.engine
                .record_stay(r1(), range("2025-03-10", "2025-03-12"))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_pruned_past_stays_free_their_token() {
        let f = fixture(1).await;
        let token = AttemptToken::new("t-old");
        assert!(
            f.engine
                .confirm(r1(), range("2025-03-02", "2025-03-04"), &token)
                .await
                .unwrap()
        );
        f.engine
            .record_stay(r1(), range("2025-03-20", "2025-03-22"))
            .await
            .unwrap();

        f.clock.advance(Duration::from_secs(5 * 24 * 3600));
        assert_eq!(f.engine.prune_past_stays(f.clock.today()).await, 1);

        let holds = f.engine.holds(r1()).await;
        assert_eq!(holds.len(), 1);
        assert_eq!(holds[0].token, None);
        f.engine.release(r1(), &token).await.unwrap();
    }
}
