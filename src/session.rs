//! Session lifecycle
//!
//! Drives one connection through validation, admission, the receive loop
//! and cleanup:
//!
//! ```text
//! Validating ──reject──────────────────────────────► Closed
//!     │ join ok
//!     ▼
//! Admitted ──► Streaming ──read error / closed──► Closing ──► Closed
//!                  │ admin "/close"                              ▲
//!                  └─────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broadcast::{broadcast, close_room};
use crate::client::ClientHandle;
use crate::connection::{spawn_writer, FrameSink, FrameSource};
use crate::error::{AppError, TransportError};
use crate::message::{ClientMessage, ServerMessage};
use crate::registry::RoomRegistry;
use crate::room::Room;
use crate::types::{ClientId, RoomCreation, RoomId};

/// Outbound queue size per connection
pub const DEFAULT_OUTBOUND_BUFFER: usize = 32;

/// Per-session settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Close a session that has not sent anything for this long
    pub idle_timeout: Option<Duration>,
    /// Frames queued for a member before it counts as too slow
    pub outbound_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: None,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    /// Validation failed; the client was never admitted
    Rejected,
    /// The peer went away (read error, close frame or idle timeout)
    Disconnected,
    /// Our side of the connection was closed: room torn down or member evicted
    ConnectionClosed,
    /// The admin closed the room with the close command
    ClosedRoom,
}

/// Run one client connection to completion
///
/// Cleanup runs exactly once on every path after admission.
pub async fn run_session<S, R>(
    registry: Arc<RoomRegistry>,
    config: &SessionConfig,
    room_id: String,
    username: String,
    sink: S,
    mut source: R,
) -> SessionExit
where
    S: FrameSink,
    R: FrameSource,
{
    let (tx, rx) = mpsc::channel(config.outbound_buffer.max(1));
    let shutdown = CancellationToken::new();
    let writer = spawn_writer(sink, rx, shutdown.clone());
    let client = ClientHandle::new(ClientId::new(), username, tx, shutdown);

    let exit = match admit(&registry, &room_id, &client).await {
        Ok((room, is_admin)) => {
            let _ = client.send(ServerMessage::AdminStatus { is_admin });
            let exit = stream(&registry, &room, &client, is_admin, &mut source, config.idle_timeout).await;
            if exit != SessionExit::ClosedRoom {
                depart(&registry, &room, &client).await;
            }
            exit
        }
        Err(e) => {
            warn!("Rejecting {:?} for room {:?}: {}", client.username, room_id, e);
            let _ = client.send(e.into());
            SessionExit::Rejected
        }
    };

    client.close();
    let _ = writer.await;
    debug!("Session for {} ended: {:?}", client.username, exit);
    exit
}

/// Validate the connection parameters and join the room
async fn admit(
    registry: &RoomRegistry,
    room_id: &str,
    client: &ClientHandle,
) -> Result<(Arc<Room>, bool), AppError> {
    if room_id.is_empty() || client.username.is_empty() {
        return Err(AppError::MissingParameters);
    }

    let room_id = RoomId::from(room_id);
    loop {
        let room = registry.resolve(&room_id).await?;
        match room.join(client.clone()).await {
            // Lost a race with the room's teardown; implicit mode makes a fresh one
            Err(AppError::RoomNotFound(_)) if registry.creation() == RoomCreation::Implicit => {
                continue
            }
            Err(e) => return Err(e),
            Ok(outcome) => {
                if outcome.is_admin {
                    info!("User {} is the admin of room {}", client.username, room.id);
                }
                info!("User {} joined room {}", client.username, room.id);
                return Ok((room, outcome.is_admin));
            }
        }
    }
}

/// Receive loop for an admitted member
async fn stream<R: FrameSource>(
    registry: &RoomRegistry,
    room: &Arc<Room>,
    client: &ClientHandle,
    is_admin: bool,
    source: &mut R,
    idle_timeout: Option<Duration>,
) -> SessionExit {
    loop {
        let frame = tokio::select! {
            biased;
            _ = client.shut_down() => return SessionExit::ConnectionClosed,
            _ = client.closed() => return SessionExit::ConnectionClosed,
            frame = next_frame(source, idle_timeout) => frame,
        };

        let text = match frame {
            Some(Ok(text)) => text,
            Some(Err(e)) => {
                debug!("Error reading message from {} in room {}: {}", client.username, room.id, e);
                return SessionExit::Disconnected;
            }
            None => return SessionExit::Disconnected,
        };

        let msg = match ClientMessage::parse(&text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Invalid message from {} in room {}: {}", client.username, room.id, e);
                let _ = client.send(e.into());
                continue;
            }
        };

        if is_admin && msg.is_close_command() {
            info!("Admin {} is closing room {}", client.username, room.id);
            close_room(registry, room).await;
            return SessionExit::ClosedRoom;
        }

        debug!("Message from {} in room {}: {}", client.username, room.id, msg.text);
        if broadcast(registry, room, client, &msg.text).await.is_none() {
            debug!("{} is no longer in room {}, dropping message", client.username, room.id);
            return SessionExit::ConnectionClosed;
        }
    }
}

async fn next_frame<R: FrameSource>(
    source: &mut R,
    idle_timeout: Option<Duration>,
) -> Option<Result<String, TransportError>> {
    match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, source.receive())
            .await
            .unwrap_or(Some(Err(TransportError::IdleTimeout))),
        None => source.receive().await,
    }
}

/// Remove the member and apply the room's departure rules
async fn depart(registry: &RoomRegistry, room: &Arc<Room>, client: &ClientHandle) {
    let outcome = room.leave(client.id).await;

    if outcome.closes_room() {
        info!("Admin {} left room {}. Closing room.", client.username, room.id);
        close_room(registry, room).await;
    } else if outcome.was_member {
        info!("User {} left room {}", client.username, room.id);
        if outcome.empties_room() {
            registry.remove_room(room).await;
        }
    }
}
