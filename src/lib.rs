//! In-memory WebSocket Chat-Room Relay Library
//!
//! Clients join a named room over a WebSocket and every text message they
//! send is fanned out to the other members of the same room.
//!
//! # Features
//! - Room creation with random 8-character ids
//! - Room lookup
//! - Unique usernames per room
//! - First joiner becomes the room admin
//! - Admin-only `/close` command
//! - Eviction of members whose connection fails
//! - Explicit or implicit room creation policy
//!
//! # Architecture
//! Shared state guarded by locks, one per room plus one for the registry:
//! - `RoomRegistry` owns the room map and is injected into every handler
//! - `Room` serialises membership changes
//! - `broadcast` snapshots a room's members and sends with the lock released
//! - `run_session` drives one connection from join to cleanup
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use room_relay::{http, AppState, RoomCreation, RoomRegistry, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let state = Arc::new(AppState::new(
//!         RoomRegistry::new(RoomCreation::Explicit),
//!         SessionConfig::default(),
//!     ));
//!     http::serve(listener, state, std::future::pending()).await.unwrap();
//! }
//! ```

pub mod broadcast;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod http;
pub mod message;
pub mod registry;
pub mod room;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use client::ClientHandle;
pub use config::ServerConfig;
pub use connection::{FrameSink, FrameSource};
pub use error::{AppError, SendError, TransportError};
pub use http::{router, AppState};
pub use message::{ClientMessage, ServerMessage};
pub use registry::RoomRegistry;
pub use room::{JoinOutcome, LeaveOutcome, Room};
pub use session::{run_session, SessionConfig, SessionExit};
pub use types::{ClientId, RoomCreation, RoomId};
