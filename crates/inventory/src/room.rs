use common::RoomId;
use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, Result};

/// A bookable room owned by the inventory authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub hotel_id: i64,
    pub number: String,
    pub room_type: String,
    pub price_cents: u64,
    /// Rooms flagged unavailable are never offered or confirmed.
    pub available: bool,
    /// Completed bookings; only ever incremented.
    pub times_booked: u64,
}

/// Data needed to add a room; the repository assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoom {
    pub hotel_id: i64,
    pub number: String,
    #[serde(default = "default_room_type")]
    pub room_type: String,
    #[serde(default)]
    pub price_cents: u64,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_room_type() -> String {
    "STANDARD".to_string()
}

fn default_available() -> bool {
    true
}

impl NewRoom {
    pub fn new(hotel_id: i64, number: impl Into<String>) -> Self {
        Self {
            hotel_id,
            number: number.into(),
            room_type: default_room_type(),
            price_cents: 0,
            available: true,
        }
    }

    pub fn with_type(mut self, room_type: impl Into<String>) -> Self {
        self.room_type = room_type.into();
        self
    }

    pub fn with_price_cents(mut self, price_cents: u64) -> Self {
        self.price_cents = price_cents;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.number.trim().is_empty() {
            return Err(InventoryError::InvalidRoom(
                "room number cannot be empty".to_string(),
            ));
        }
        if self.room_type.trim().is_empty() {
            return Err(InventoryError::InvalidRoom(
                "room type cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn into_room(self, id: RoomId) -> Room {
        Room {
            id,
            hotel_id: self.hotel_id,
            number: self.number,
            room_type: self.room_type,
            price_cents: self.price_cents,
            available: self.available,
            times_booked: 0,
        }
    }
}
