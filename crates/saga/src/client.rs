//! Remote contract of the inventory authority, as seen from the booking side.

use std::sync::Arc;

use async_trait::async_trait;
use common::{AttemptToken, DateRange, RoomId};
use inventory::{AvailabilityEngine, InventoryError};
use thiserror::Error;

use crate::resilience::Transient;

/// Errors returned by an [`InventoryClient`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The request never got an answer (connect failure, reset, timeout).
    #[error("Inventory service unreachable: {0}")]
    Unreachable(String),

    /// The inventory authority answered with a server-side failure.
    #[error("Inventory service error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    /// The inventory authority refused the request as malformed.
    #[error("Inventory service rejected the request: {0}")]
    Rejected(String),
}

impl Transient for RemoteError {
    fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Unreachable(_) | RemoteError::Server { .. })
    }
}

impl From<InventoryError> for RemoteError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::RoomNotFound(id) => RemoteError::RoomNotFound(id),
            InventoryError::InvalidRoom(msg) => RemoteError::Rejected(msg),
        }
    }
}

/// Calls the booking saga makes against the inventory authority.
///
/// `confirm_availability` and `release` are idempotent per attempt token;
/// `increment_times_booked` is at-least-once.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Rooms free for `dates`, least booked first.
    async fn recommend_rooms(&self, dates: DateRange) -> Result<Vec<RoomId>, RemoteError>;

    async fn confirm_availability(
        &self,
        room_id: RoomId,
        dates: DateRange,
        token: &AttemptToken,
    ) -> Result<bool, RemoteError>;

    async fn release(&self, room_id: RoomId, token: &AttemptToken) -> Result<(), RemoteError>;

    async fn increment_times_booked(&self, room_id: RoomId) -> Result<(), RemoteError>;
}

/// Talks to an [`AvailabilityEngine`] in the same process.
#[derive(Clone)]
pub struct LocalInventoryClient {
    engine: Arc<AvailabilityEngine>,
}

impl LocalInventoryClient {
    pub fn new(engine: Arc<AvailabilityEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<AvailabilityEngine> {
        &self.engine
    }
}

#[async_trait]
impl InventoryClient for LocalInventoryClient {
    async fn recommend_rooms(&self, dates: DateRange) -> Result<Vec<RoomId>, RemoteError> {
        Ok(self.engine.recommend_rooms(dates).await?)
    }

    async fn confirm_availability(
        &self,
        room_id: RoomId,
        dates: DateRange,
        token: &AttemptToken,
    ) -> Result<bool, RemoteError> {
        Ok(self.engine.confirm(room_id, dates, token).await?)
    }

    async fn release(&self, room_id: RoomId, token: &AttemptToken) -> Result<(), RemoteError> {
        Ok(self.engine.release(room_id, token).await?)
    }

    async fn increment_times_booked(&self, room_id: RoomId) -> Result<(), RemoteError> {
        self.engine.increment_times_booked(room_id).await?;
        Ok(())
    }
}
