//! Broadcast engine
//!
//! Fan-out of chat messages to room members and forced room teardown.
//! Members are copied out of the room under its lock and then sent to with
//! the lock released, so one slow or dead peer never holds up the others.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::client::ClientHandle;
use crate::message::ServerMessage;
use crate::registry::RoomRegistry;
use crate::room::Room;

/// Deliver `text` from `sender` to every other member of `room`
///
/// Members whose send fails are closed and removed from the room, which may
/// in turn close the room (evicted admin) or unregister it (last member).
/// Returns the number of members the message was queued for, or `None` if
/// `sender` is not a member of the room (anymore).
pub async fn broadcast(
    registry: &RoomRegistry,
    room: &Arc<Room>,
    sender: &ClientHandle,
    text: &str,
) -> Option<usize> {
    let recipients = room.snapshot_for(sender.id).await?;
    let msg = ServerMessage::Message {
        user: sender.username.clone(),
        text: text.to_string(),
    };

    let mut delivered = 0;
    let mut failed = Vec::new();
    for member in recipients {
        match member.send(msg.clone()) {
            Ok(()) => delivered += 1,
            Err(e) => {
                warn!(
                    "Room {}: dropping {} after failed send: {}",
                    room.id, member.username, e
                );
                failed.push(member);
            }
        }
    }

    for member in failed {
        evict(registry, room, &member).await;
    }

    debug!(
        "Room {}: message from {} delivered to {}",
        room.id, sender.username, delivered
    );
    Some(delivered)
}

/// Notify every member that the room is gone, disconnect them and
/// unregister the room
///
/// Safe to race with members leaving on their own; each member is notified
/// at most once.
pub async fn close_room(registry: &RoomRegistry, room: &Arc<Room>) {
    let members = room.close().await;
    if members.is_empty() && !registry.remove_room(room).await {
        return;
    }
    info!(
        "Room {}: closing after {:?}, disconnecting {} member(s)",
        room.id,
        room.created_at.elapsed(),
        members.len()
    );

    for member in members {
        if let Err(e) = member.send(ServerMessage::room_closed()) {
            warn!(
                "Room {}: could not notify {} of closure: {}",
                room.id, member.username, e
            );
        }
        member.close();
    }

    registry.remove_room(room).await;
}

/// Disconnect a member whose connection failed and apply departure rules
async fn evict(registry: &RoomRegistry, room: &Arc<Room>, member: &ClientHandle) {
    member.close();
    let outcome = room.leave(member.id).await;

    if outcome.closes_room() {
        info!("Room {}: admin {} evicted", room.id, member.username);
        close_room(registry, room).await;
    } else if outcome.empties_room() {
        registry.remove_room(room).await;
    }
}
