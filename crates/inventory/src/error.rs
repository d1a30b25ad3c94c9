use common::RoomId;
use thiserror::Error;

/// Errors raised by the inventory authority.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    #[error("Invalid room: {0}")]
    InvalidRoom(String),
}

pub type Result<T> = std::result::Result<T, InventoryError>;
