//! Error types for the relay
//!
//! Defines application-level errors, member queue errors and transport errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Validation errors are reported to the offending connection only.
#[derive(Debug, Error)]
pub enum AppError {
    /// Room id or username missing from the connection parameters
    #[error("Room ID and Username are required")]
    MissingParameters,

    /// Room id is not registered (or the room was just torn down)
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    /// Another member of the room already uses this username
    #[error("Username already taken: {0}")]
    DuplicateUsername(String),

    /// Inbound payload was not a JSON object with a `text` field
    #[error("Invalid message format: {0}")]
    InvalidMessage(#[from] serde_json::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Member queue errors
///
/// Occurs when delivering to a member whose outbound queue cannot accept
/// another frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The writer for this connection has stopped
    #[error("Channel closed")]
    ChannelClosed,

    /// The member is not draining its queue fast enough
    #[error("Outbound queue full")]
    Lagging,
}

/// Socket-level failures
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] axum::Error),

    /// No frame arrived within the configured idle timeout
    #[error("Idle timeout elapsed")]
    IdleTimeout,

    #[error("Connection closed")]
    Closed,
}
