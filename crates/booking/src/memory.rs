use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{HolderId, ReservationId, RoomId};
use tokio::sync::RwLock;

use crate::error::{RepositoryError, Result};
use crate::repository::ReservationRepository;
use crate::reservation::{Reservation, ReservationStatus};

/// In-memory reservation store.
///
/// Provides the same interface as the PostgreSQL implementation. Used by
/// tests and when no database is configured.
#[derive(Clone, Default)]
pub struct InMemoryReservationRepository {
    records: Arc<RwLock<HashMap<ReservationId, Reservation>>>,
}

impl InMemoryReservationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of stored records.
    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns every stored record, oldest first.
    pub async fn all(&self) -> Vec<Reservation> {
        let mut all: Vec<_> = self.records.read().await.values().cloned().collect();
        all.sort_by_key(|r| r.created_at());
        all
    }
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn insert(&self, reservation: &Reservation) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&reservation.id()) {
            return Err(RepositoryError::Duplicate(reservation.id()));
        }
        records.insert(reservation.id(), reservation.clone());
        Ok(())
    }

    async fn get(&self, id: ReservationId) -> Result<Option<Reservation>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn update(&self, reservation: &Reservation) -> Result<Reservation> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(&reservation.id())
            .ok_or(RepositoryError::NotFound(reservation.id()))?;

        if stored.version() != reservation.version() {
            return Err(RepositoryError::ConcurrencyConflict {
                reservation_id: reservation.id(),
                expected: reservation.version(),
                actual: stored.version(),
            });
        }

        let updated = reservation.clone().with_version(reservation.version() + 1);
        *stored = updated.clone();
        Ok(updated)
    }

    async fn find_by_room(
        &self,
        room_id: RoomId,
        statuses: &[ReservationStatus],
    ) -> Result<Vec<Reservation>> {
        let records = self.records.read().await;
        let mut found: Vec<_> = records
            .values()
            .filter(|r| r.room_id() == room_id && statuses.contains(&r.status()))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at());
        Ok(found)
    }

    async fn find_by_holder(&self, holder: &HolderId) -> Result<Vec<Reservation>> {
        let records = self.records.read().await;
        let mut found: Vec<_> = records
            .values()
            .filter(|r| r.is_held_by(holder))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at());
        Ok(found)
    }
}
