//! Message protocol definitions
//!
//! JSON-based message protocol. Outbound frames use Serde's tagged enum,
//! inbound frames are plain objects carrying a `text` field.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Chat text that lets the room admin tear the room down
pub const CLOSE_COMMAND: &str = "/close";

/// Notice sent to every member when a room is torn down
pub const ROOM_CLOSED_TEXT: &str = "Room has been closed by the admin.";

pub const ROOM_NOT_FOUND_TEXT: &str = "Room does not exist";

/// Client → Server message
///
/// Unknown fields are ignored; a missing `text` is a malformed payload.
#[derive(Debug, Deserialize)]
pub struct ClientMessage {
    pub text: String,
}

impl ClientMessage {
    /// Parse an inbound text frame
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn is_close_command(&self) -> bool {
        self.text == CLOSE_COMMAND
    }
}

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Validation or protocol failure
    Error { text: String },
    /// Sent once on admission
    AdminStatus {
        #[serde(rename = "isAdmin")]
        is_admin: bool,
    },
    /// Relayed chat message
    Message { user: String, text: String },
    /// Terminal notice before forced disconnect
    RoomClosed { text: String },
}

impl ServerMessage {
    pub fn error(text: impl Into<String>) -> Self {
        ServerMessage::Error { text: text.into() }
    }

    pub fn room_closed() -> Self {
        ServerMessage::RoomClosed {
            text: ROOM_CLOSED_TEXT.to_string(),
        }
    }
}

/// Convert AppError to ServerMessage for client notification
impl From<AppError> for ServerMessage {
    fn from(err: AppError) -> Self {
        let text = match &err {
            AppError::MissingParameters => "Room ID and Username are required",
            AppError::RoomNotFound(_) => ROOM_NOT_FOUND_TEXT,
            AppError::DuplicateUsername(_) => "Username already exists in the room",
            AppError::InvalidMessage(_) => "Invalid message format",
            AppError::Io(_) => "Internal error",
        };
        ServerMessage::error(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_deserialize() {
        let msg = ClientMessage::parse(r#"{"text": "hi", "extra": "ignored"}"#).unwrap();
        assert_eq!(msg.text, "hi");
        assert!(!msg.is_close_command());
    }

    #[test]
    fn test_client_message_requires_text() {
        assert!(ClientMessage::parse(r#"{"body": "hi"}"#).is_err());
        assert!(ClientMessage::parse("not json").is_err());
        assert!(ClientMessage::parse(r#"{"text": 5}"#).is_err());
    }

    #[test]
    fn test_close_command() {
        let msg = ClientMessage::parse(r#"{"text": "/close"}"#).unwrap();
        assert!(msg.is_close_command());
    }

    #[test]
    fn test_server_message_serialize() {
        let msg = ServerMessage::Message {
            user: "Alice".to_string(),
            text: "hi".to_string(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "message", "user": "Alice", "text": "hi"})
        );
    }

    #[test]
    fn test_admin_status_serialize() {
        let value = serde_json::to_value(ServerMessage::AdminStatus { is_admin: true }).unwrap();
        assert_eq!(value, serde_json::json!({"type": "admin-status", "isAdmin": true}));
    }

    #[test]
    fn test_room_closed_serialize() {
        let value = serde_json::to_value(ServerMessage::room_closed()).unwrap();
        assert_eq!(value["type"], "room-closed");
        assert_eq!(value["text"], ROOM_CLOSED_TEXT);
    }

    #[test]
    fn test_error_conversion() {
        let msg: ServerMessage = AppError::RoomNotFound("r1".to_string()).into();
        assert_eq!(msg, ServerMessage::error("Room does not exist"));

        let msg: ServerMessage = AppError::DuplicateUsername("Bob".to_string()).into();
        assert_eq!(msg, ServerMessage::error("Username already exists in the room"));

        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
        let msg: ServerMessage = AppError::from(io).into();
        assert_eq!(msg, ServerMessage::error("Internal error"));
    }
}
