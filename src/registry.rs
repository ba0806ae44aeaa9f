//! Room registry
//!
//! Owns the mapping from room id to room. Every structural change happens
//! under a single lock; the lock is never held across a network send.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::AppError;
use crate::room::Room;
use crate::types::{RoomCreation, RoomId};

/// Registry of live rooms
///
/// Built once by the composition root and shared as `Arc<RoomRegistry>`.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomId, Arc<Room>>>,
    creation: RoomCreation,
}

impl RoomRegistry {
    /// Create an empty registry with the given room creation policy
    pub fn new(creation: RoomCreation) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            creation,
        }
    }

    pub fn creation(&self) -> RoomCreation {
        self.creation
    }

    /// Register a room under a fresh id
    ///
    /// Collisions with a live room are retried with a new id, never
    /// overwritten. No member is admitted.
    pub async fn create_room(&self) -> RoomId {
        let mut rooms = self.rooms.lock().await;
        loop {
            let id = RoomId::generate();
            match rooms.entry(id) {
                Entry::Occupied(entry) => {
                    debug!("Room id {} already taken, retrying", entry.key());
                }
                Entry::Vacant(entry) => {
                    let id = entry.key().clone();
                    entry.insert(Arc::new(Room::new(id.clone())));
                    info!("Room {} created", id);
                    return id;
                }
            }
        }
    }

    /// Return the room, creating an empty one if the id is unknown
    ///
    /// A room that was torn down but not yet unregistered is replaced.
    pub async fn get_or_create(&self, id: &RoomId) -> Arc<Room> {
        let mut rooms = self.rooms.lock().await;
        if let Some(room) = rooms.get(id) {
            if !room.is_closed().await {
                return room.clone();
            }
        }

        let room = Arc::new(Room::new(id.clone()));
        rooms.insert(id.clone(), room.clone());
        info!("Room {} created", id);
        room
    }

    /// Look up a room
    pub async fn get(&self, id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.lock().await.get(id).cloned()
    }

    /// Find the room a joining client asked for, honouring the creation policy
    pub async fn resolve(&self, id: &RoomId) -> Result<Arc<Room>, AppError> {
        match self.creation {
            RoomCreation::Implicit => Ok(self.get_or_create(id).await),
            RoomCreation::Explicit => self
                .get(id)
                .await
                .ok_or_else(|| AppError::RoomNotFound(id.to_string())),
        }
    }

    pub async fn exists(&self, id: &RoomId) -> bool {
        self.rooms.lock().await.contains_key(id)
    }

    /// Remove a room by id; deleting an unknown id is a no-op
    pub async fn delete(&self, id: &RoomId) {
        if self.rooms.lock().await.remove(id).is_some() {
            info!("Room {} deleted", id);
        }
    }

    /// Remove `room` only if its id still maps to this very instance
    ///
    /// Returns true if the entry was removed.
    pub async fn remove_room(&self, room: &Arc<Room>) -> bool {
        let mut rooms = self.rooms.lock().await;
        match rooms.get(&room.id) {
            Some(current) if Arc::ptr_eq(current, room) => {
                rooms.remove(&room.id);
                info!("Room {} deleted", room.id);
                true
            }
            _ => false,
        }
    }

    /// Get the number of live rooms
    pub async fn len(&self) -> usize {
        self.rooms.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.lock().await.is_empty()
    }
}
