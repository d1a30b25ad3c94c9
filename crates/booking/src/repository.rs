use async_trait::async_trait;
use common::{HolderId, ReservationId, RoomId};

use crate::error::Result;
use crate::reservation::{Reservation, ReservationStatus};

/// Statuses that occupy a room's dates.
pub const ACTIVE_STATUSES: [ReservationStatus; 2] =
    [ReservationStatus::Pending, ReservationStatus::Confirmed];

/// Storage port for reservation records.
///
/// Records are never deleted. Updates are compare-and-set on
/// [`Reservation::version`].
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Stores a new record.
    ///
    /// Returns `RepositoryError::Duplicate` if the id is already taken.
    async fn insert(&self, reservation: &Reservation) -> Result<()>;

    /// Loads a record by id.
    async fn get(&self, id: ReservationId) -> Result<Option<Reservation>>;

    /// Writes `reservation` if the stored version still equals
    /// `reservation.version()`. Returns the stored copy with its new version.
    ///
    /// Returns `RepositoryError::ConcurrencyConflict` if another writer got
    /// there first.
    async fn update(&self, reservation: &Reservation) -> Result<Reservation>;

    /// Records for `room_id` whose status is in `statuses`.
    async fn find_by_room(
        &self,
        room_id: RoomId,
        statuses: &[ReservationStatus],
    ) -> Result<Vec<Reservation>>;

    /// Records held by `holder`, oldest first.
    async fn find_by_holder(&self, holder: &HolderId) -> Result<Vec<Reservation>>;
}
