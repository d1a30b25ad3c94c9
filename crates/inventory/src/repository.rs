use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::RoomId;
use tokio::sync::RwLock;

use crate::error::{InventoryError, Result};
use crate::room::{NewRoom, Room};

/// Storage port for rooms.
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Stores a new room and returns it with its assigned id.
    async fn insert(&self, room: NewRoom) -> Result<Room>;

    async fn get(&self, id: RoomId) -> Result<Option<Room>>;

    /// All rooms ordered by id.
    async fn list(&self) -> Result<Vec<Room>>;

    /// Overwrites an existing room.
    async fn update(&self, room: &Room) -> Result<()>;
}

#[derive(Default)]
struct State {
    rooms: BTreeMap<RoomId, Room>,
    next_id: i64,
}

/// In-memory room store with sequential ids starting at 1.
#[derive(Clone, Default)]
pub struct InMemoryRoomRepository {
    state: Arc<RwLock<State>>,
}

impl InMemoryRoomRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn insert(&self, room: NewRoom) -> Result<Room> {
        room.validate()?;
        let mut state = self.state.write().await;
        state.next_id += 1;
        let room = room.into_room(RoomId::new(state.next_id));
        state.rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn get(&self, id: RoomId) -> Result<Option<Room>> {
        Ok(self.state.read().await.rooms.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Room>> {
        Ok(self.state.read().await.rooms.values().cloned().collect())
    }

    async fn update(&self, room: &Room) -> Result<()> {
        let mut state = self.state.write().await;
        let stored = state
            .rooms
            .get_mut(&room.id)
            .ok_or(InventoryError::RoomNotFound(room.id))?;
        *stored = room.clone();
        Ok(())
    }
}
