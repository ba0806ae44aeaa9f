//! Client handle definition
//!
//! Represents an admitted room member: their identity, display name and the
//! outbound side of their connection.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ClientId;

/// Handle to one member's connection
///
/// Cheap to clone. The room keeps one copy per member, broadcast snapshots
/// take short-lived copies, and the session owns the original.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    /// Unique identifier for this connection
    pub id: ClientId,
    /// Display name, unique within the room
    pub username: String,
    /// Server → Client message queue, drained by the connection's writer
    sender: mpsc::Sender<ServerMessage>,
    /// Ends both the writer and the session's receive loop
    shutdown: CancellationToken,
}

impl ClientHandle {
    pub fn new(
        id: ClientId,
        username: String,
        sender: mpsc::Sender<ServerMessage>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            id,
            username,
            sender,
            shutdown,
        }
    }

    /// Queue a message for this client
    ///
    /// Never waits: a full queue means the peer is too slow and counts as a
    /// failed send, same as a closed one.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Lagging,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Disconnect this client
    ///
    /// The session stops reading, and the writer gets a bounded window to
    /// flush queued frames before the socket is dropped. Safe to call more
    /// than once and from any task.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    /// Check whether `close` has been called
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Wait until `close` is called
    pub async fn shut_down(&self) {
        self.shutdown.cancelled().await
    }

    /// Check whether the writer has already stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Wait until the writer has stopped
    pub async fn closed(&self) {
        self.sender.closed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(capacity: usize) -> (ClientHandle, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        let client = ClientHandle::new(
            ClientId::new(),
            "Alice".to_string(),
            tx,
            CancellationToken::new(),
        );
        (client, rx)
    }

    #[tokio::test]
    async fn test_client_send() {
        let (client, mut rx) = handle(4);
        client.send(ServerMessage::error("x")).unwrap();
        assert_eq!(rx.recv().await, Some(ServerMessage::error("x")));
    }

    #[tokio::test]
    async fn test_client_send_full_queue_is_lagging() {
        let (client, _rx) = handle(1);
        client.send(ServerMessage::error("a")).unwrap();
        assert_eq!(client.send(ServerMessage::error("b")), Err(SendError::Lagging));
    }

    #[tokio::test]
    async fn test_client_send_after_writer_gone() {
        let (client, rx) = handle(4);
        drop(rx);
        assert!(client.is_closed());
        assert_eq!(
            client.send(ServerMessage::error("a")),
            Err(SendError::ChannelClosed)
        );
    }

    #[tokio::test]
    async fn test_client_close_is_seen_by_every_clone() {
        let (client, _rx) = handle(4);
        let copy = client.clone();
        assert!(!copy.is_shut_down());

        client.close();
        client.close();

        assert!(copy.is_shut_down());
        tokio::time::timeout(std::time::Duration::from_secs(1), copy.shut_down())
            .await
            .unwrap();
    }
}
