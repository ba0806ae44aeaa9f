//! Basic type definitions for the relay
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: UUID-based unique connection identifier
//! - `RoomId`: opaque room identifier
//! - `RoomCreation`: how unknown room ids are treated on join

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of generated room ids
pub const ROOM_ID_LEN: usize = 8;

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4. Two connections with the same username are still
/// distinct members as far as the room's bookkeeping is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room identifier
///
/// Client-supplied ids are used verbatim (case-sensitive).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Generate a new random alphanumeric room id
    ///
    /// Uses the thread-local generator, so concurrent callers never share
    /// (or reseed) a single random source.
    pub fn generate() -> Self {
        use rand::Rng;
        let id: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(ROOM_ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happens when a client joins a room id that is not registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RoomCreation {
    /// Rooms must be created up front (`/create-room`); unknown ids are rejected
    Explicit,
    /// Joining an unknown id creates the room on the spot
    Implicit,
}
