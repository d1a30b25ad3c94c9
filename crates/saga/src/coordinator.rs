//! Booking saga orchestrator.

use std::sync::Arc;

use booking::{
    ACTIVE_STATUSES, BookingRequest, RepositoryError, Reservation, ReservationRepository,
    ReservationStatus,
};
use common::{AttemptToken, Clock, DateRange, HolderId, KeyedLocks, ReservationId, RoomId};

use crate::client::InventoryClient;
use crate::error::BookingError;
use crate::resilience::ResiliencePolicy;
use crate::steps;

/// What to do with the local record when compensating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CancelWhen {
    /// The remote side said no; the record is cancelled whatever release does.
    Always,
    /// Outcome unknown; cancel only once the remote hold is known to be gone.
    Released,
}

/// Orchestrates bookings across the booking and inventory authorities.
///
/// A booking is reserved locally as PENDING, confirmed remotely, then
/// committed to CONFIRMED. Failures after the local reservation are
/// compensated by releasing the remote attempt and cancelling the record.
pub struct BookingSaga {
    reservations: Arc<dyn ReservationRepository>,
    inventory: Arc<dyn InventoryClient>,
    policy: ResiliencePolicy,
    clock: Arc<dyn Clock>,
    room_locks: KeyedLocks<RoomId>,
}

impl BookingSaga {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        inventory: Arc<dyn InventoryClient>,
        policy: ResiliencePolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reservations,
            inventory,
            policy,
            clock,
            room_locks: KeyedLocks::new(),
        }
    }

    pub fn policy(&self) -> &ResiliencePolicy {
        &self.policy
    }

    /// Books a room for `holder`.
    ///
    /// On success the returned reservation is CONFIRMED and the inventory
    /// authority holds the stay. On failure the reservation was either never
    /// stored, is CANCELLED, or (when neither confirm nor release could reach
    /// the inventory authority) is left PENDING and logged for
    /// reconciliation.
    #[tracing::instrument(skip(self, request), fields(saga_type = steps::SAGA_TYPE))]
    pub async fn create_booking(
        &self,
        request: BookingRequest,
        holder: HolderId,
    ) -> Result<Reservation, BookingError> {
        metrics::counter!("booking_saga_started_total").increment(1);
        let saga_start = std::time::Instant::now();

        let result = self.run(request, holder).await;

        metrics::histogram!("booking_saga_duration_seconds")
            .record(saga_start.elapsed().as_secs_f64());
        match &result {
            Ok(reservation) => {
                metrics::counter!("booking_saga_completed_total").increment(1);
                tracing::info!(
                    reservation_id = %reservation.id(),
                    room_id = %reservation.room_id(),
                    "booking confirmed"
                );
            }
            Err(e) => {
                metrics::counter!("booking_saga_failed_total", "reason" => e.reason())
                    .increment(1);
                tracing::warn!(reason = e.reason(), error = %e, "booking failed");
            }
        }

        result
    }

    async fn run(
        &self,
        request: BookingRequest,
        holder: HolderId,
    ) -> Result<Reservation, BookingError> {
        tracing::debug!(step = steps::STEP_VALIDATE, "saga step started");
        let validated = request.validate(self.clock.today())?;
        let dates = validated.dates;

        let room_id = match (validated.auto_select, validated.room_id) {
            (true, requested) => {
                if let Some(requested) = requested {
                    let _guard = self.room_locks.lock(&requested).await;
                    self.ensure_no_conflict(requested, dates).await?;
                }
                self.auto_select(dates).await?
            }
            (false, Some(room_id)) => room_id,
            (false, None) => return Err(booking::ValidationError::MissingRoom.into()),
        };

        let reservation = {
            let _guard = self.room_locks.lock(&room_id).await;
            match self.ensure_no_conflict(room_id, dates).await {
                Err(BookingError::Conflict { .. }) if validated.auto_select => {
                    return Err(BookingError::NoCapacity(dates));
                }
                other => other?,
            }

            tracing::debug!(step = steps::STEP_RESERVE, %room_id, "saga step started");
            let reservation = Reservation::pending(holder, room_id, dates, self.clock.now());
            self.reservations.insert(&reservation).await?;
            reservation
        };
        let token = reservation.attempt().clone();

        tracing::info!(
            step = steps::STEP_CONFIRM,
            reservation_id = %reservation.id(),
            %room_id,
            %token,
            "saga step started"
        );
        let inventory = &self.inventory;
        let confirmed = self
            .policy
            .call(steps::OP_CONFIRM, || {
                inventory.confirm_availability(room_id, dates, &token)
            })
            .await;

        match confirmed {
            Ok(true) => {}
            Ok(false) => {
                self.compensate(reservation, &token, CancelWhen::Always)
                    .await;
                return Err(BookingError::NotAvailable(room_id));
            }
            Err(e) => {
                tracing::warn!(error = %e, "confirm failed");
                self.compensate(reservation, &token, CancelWhen::Released)
                    .await;
                return Err(e.into());
            }
        }

        tracing::debug!(step = steps::STEP_COMMIT, "saga step started");
        let mut to_commit = reservation.clone();
        let committed = match to_commit.confirm() {
            Ok(()) => self
                .reservations
                .update(&to_commit)
                .await
                .map_err(BookingError::from),
            Err(e) => Err(BookingError::Internal(e.to_string())),
        };
        let committed = match committed {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(error = %e, "commit failed");
                self.compensate(reservation, &token, CancelWhen::Released)
                    .await;
                return Err(e);
            }
        };

        tracing::debug!(step = steps::STEP_INCREMENT, "saga step started");
        if let Err(e) = self
            .policy
            .call_unguarded(steps::OP_INCREMENT, || {
                inventory.increment_times_booked(room_id)
            })
            .await
        {
            tracing::warn!(%room_id, error = %e, "failed to count booking; continuing");
        }

        Ok(committed)
    }

    /// Fails with `Conflict` if an active reservation on `room_id` overlaps
    /// `dates`. Callers hold the room lock.
    async fn ensure_no_conflict(
        &self,
        room_id: RoomId,
        dates: DateRange,
    ) -> Result<(), BookingError> {
        tracing::debug!(step = steps::STEP_CHECK_CONFLICTS, %room_id, "saga step started");
        let active = self
            .reservations
            .find_by_room(room_id, &ACTIVE_STATUSES)
            .await?;

        if active.iter().any(|r| r.conflicts_with(&dates)) {
            return Err(BookingError::Conflict { room_id, dates });
        }
        Ok(())
    }

    async fn auto_select(&self, dates: DateRange) -> Result<RoomId, BookingError> {
        tracing::debug!(step = steps::STEP_AUTO_SELECT, "saga step started");
        let inventory = &self.inventory;
        let recommended = self
            .policy
            .call(steps::OP_RECOMMEND, || inventory.recommend_rooms(dates))
            .await?;

        let room_id = recommended
            .first()
            .copied()
            .ok_or(BookingError::NoCapacity(dates))?;
        tracing::info!(%room_id, "room auto-selected");
        Ok(room_id)
    }

    /// Best-effort undo of a reserved attempt. Never fails; problems are
    /// logged.
    async fn compensate(
        &self,
        reservation: Reservation,
        token: &AttemptToken,
        when: CancelWhen,
    ) {
        let room_id = reservation.room_id();
        tracing::info!(
            step = steps::STEP_COMPENSATE,
            reservation_id = %reservation.id(),
            %room_id,
            "saga step started"
        );

        let mut reservation = reservation;
        if when == CancelWhen::Always {
            reservation = self.cancel_pending(reservation).await;
        }

        let inventory = &self.inventory;
        let released = self
            .policy
            .call_unguarded(steps::OP_RELEASE, || inventory.release(room_id, token))
            .await;

        match released {
            Ok(()) => {
                if when == CancelWhen::Released {
                    self.cancel_pending(reservation).await;
                }
            }
            Err(e) if when == CancelWhen::Released => {
                tracing::error!(
                    reservation_id = %reservation.id(),
                    %room_id,
                    %token,
                    error = %e,
                    "compensation failed; reservation left PENDING for reconciliation"
                );
            }
            Err(e) => {
                tracing::error!(
                    reservation_id = %reservation.id(),
                    %room_id,
                    %token,
                    error = %e,
                    "release failed after refusal"
                );
            }
        }
    }

    async fn cancel_pending(&self, reservation: Reservation) -> Reservation {
        let mut cancelled = reservation.clone();
        if let Err(e) = cancelled.cancel() {
            tracing::error!(reservation_id = %reservation.id(), error = %e, "cannot cancel");
            return reservation;
        }
        match self.reservations.update(&cancelled).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(
                    reservation_id = %reservation.id(),
                    error = %e,
                    "failed to cancel reservation"
                );
                reservation
            }
        }
    }

    /// Cancels a CONFIRMED booking owned by `holder` and frees its stay at
    /// the inventory authority.
    ///
    /// PENDING and CANCELLED bookings are returned unchanged. Bookings that
    /// do not exist or belong to someone else are reported as not found.
    /// The local record is authoritative: a failed release is logged and the
    /// cancellation still stands.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(
        &self,
        reservation_id: ReservationId,
        holder: &HolderId,
    ) -> Result<Reservation, BookingError> {
        // A concurrent cancel may win the version race; re-read and re-decide
        for _ in 0..3 {
            let current = self.get_booking(reservation_id, holder).await?;
            if current.status() != ReservationStatus::Confirmed {
                tracing::debug!(status = %current.status(), "nothing to cancel");
                return Ok(current);
            }

            let mut cancelled = current.clone();
            cancelled
                .cancel()
                .map_err(|e| BookingError::Internal(e.to_string()))?;

            match self.reservations.update(&cancelled).await {
                Ok(stored) => {
                    tracing::info!("booking cancelled");
                    self.release_stay(&stored).await;
                    return Ok(stored);
                }
                Err(RepositoryError::ConcurrencyConflict { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(BookingError::Internal(format!(
            "reservation {reservation_id} kept changing during cancel"
        )))
    }

    async fn release_stay(&self, reservation: &Reservation) {
        let room_id = reservation.room_id();
        let token = reservation.attempt();
        let inventory = &self.inventory;
        let released = self
            .policy
            .call_unguarded(steps::OP_RELEASE, || inventory.release(room_id, token))
            .await;

        if let Err(e) = released {
            tracing::error!(
                reservation_id = %reservation.id(),
                %room_id,
                %token,
                error = %e,
                "failed to release cancelled stay"
            );
        }
    }

    /// Loads a booking owned by `holder`.
    #[tracing::instrument(skip(self))]
    pub async fn get_booking(
        &self,
        reservation_id: ReservationId,
        holder: &HolderId,
    ) -> Result<Reservation, BookingError> {
        self.reservations
            .get(reservation_id)
            .await?
            .filter(|r| r.is_held_by(holder))
            .ok_or_else(BookingError::booking_not_found)
    }

    /// Every booking owned by `holder`, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_bookings(
        &self,
        holder: &HolderId,
    ) -> Result<Vec<Reservation>, BookingError> {
        Ok(self.reservations.find_by_holder(holder).await?)
    }
}
