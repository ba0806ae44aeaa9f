//! Room struct definition
//!
//! Represents a chat room: its members and its admin. All membership changes
//! go through one lock per room, held only for the map mutation or snapshot.

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::debug;

use crate::client::ClientHandle;
use crate::error::AppError;
use crate::types::{ClientId, RoomId};

/// Result of a successful join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    /// The joiner became the room admin
    pub is_admin: bool,
}

/// Result of removing a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LeaveOutcome {
    /// The connection was still a member (false if already removed)
    pub was_member: bool,
    /// The departing member was the admin
    pub was_admin: bool,
    /// No members remain
    pub is_empty: bool,
}

impl LeaveOutcome {
    /// The room has to be torn down after this departure
    pub fn closes_room(&self) -> bool {
        self.was_member && self.was_admin
    }

    /// The room has to be dropped from the registry after this departure
    pub fn empties_room(&self) -> bool {
        self.was_member && !self.was_admin && self.is_empty
    }
}

#[derive(Debug, Default)]
struct RoomState {
    members: HashMap<ClientId, ClientHandle>,
    admin: Option<String>,
    /// Set once the room is destroyed; a closed room admits nobody
    closed: bool,
}

/// Chat room
///
/// The first member to join becomes admin. The room is destroyed when the
/// admin leaves or the last member leaves.
#[derive(Debug)]
pub struct Room {
    /// Room id for identification
    pub id: RoomId,
    /// Room creation time
    pub created_at: Instant,
    state: Mutex<RoomState>,
}

impl Room {
    /// Create a new, empty room
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            created_at: Instant::now(),
            state: Mutex::new(RoomState::default()),
        }
    }

    /// Admit a member
    ///
    /// The username check and the insert happen under one lock acquisition.
    pub async fn join(&self, client: ClientHandle) -> Result<JoinOutcome, AppError> {
        let mut state = self.state.lock().await;

        if state.closed {
            return Err(AppError::RoomNotFound(self.id.to_string()));
        }

        if state
            .members
            .values()
            .any(|member| member.username == client.username)
        {
            return Err(AppError::DuplicateUsername(client.username));
        }

        let is_admin = state.admin.is_none();
        if is_admin {
            state.admin = Some(client.username.clone());
        }

        debug!(
            "Room {}: {} joined (admin: {}, members: {})",
            self.id,
            client.username,
            is_admin,
            state.members.len() + 1
        );
        state.members.insert(client.id, client);

        Ok(JoinOutcome { is_admin })
    }

    /// Remove a member
    ///
    /// Idempotent: removing a connection that is already gone reports
    /// `was_member: false` and changes nothing.
    pub async fn leave(&self, client_id: ClientId) -> LeaveOutcome {
        let mut state = self.state.lock().await;

        let Some(member) = state.members.remove(&client_id) else {
            return LeaveOutcome {
                is_empty: state.members.is_empty(),
                ..LeaveOutcome::default()
            };
        };

        LeaveOutcome {
            was_member: true,
            was_admin: state.admin.as_deref() == Some(member.username.as_str()),
            is_empty: state.members.is_empty(),
        }
    }

    /// Copy every member except `sender` (compared by username)
    ///
    /// Returns `None` if `sender` is no longer a member, e.g. after being
    /// evicted; such a connection must not post to the room.
    pub async fn snapshot_for(&self, sender: ClientId) -> Option<Vec<ClientHandle>> {
        let state = self.state.lock().await;
        let sender = state.members.get(&sender)?;
        Some(
            state
                .members
                .values()
                .filter(|member| member.username != sender.username)
                .cloned()
                .collect(),
        )
    }

    /// Mark the room destroyed and take every member out of it
    ///
    /// Returns an empty list if the room was already closed, so concurrent
    /// closers notify each member only once.
    pub async fn close(&self) -> Vec<ClientHandle> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Vec::new();
        }
        state.closed = true;
        state.admin = None;
        state.members.drain().map(|(_, member)| member).collect()
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }

    /// Get the number of members in the room
    pub async fn member_count(&self) -> usize {
        self.state.lock().await.members.len()
    }

    pub async fn admin(&self) -> Option<String> {
        self.state.lock().await.admin.clone()
    }

    /// Check if a username is currently taken
    pub async fn contains(&self, username: &str) -> bool {
        self.state
            .lock()
            .await
            .members
            .values()
            .any(|member| member.username == username)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::message::ServerMessage;

    fn member(name: &str) -> (ClientHandle, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(8);
        let client = ClientHandle::new(ClientId::new(), name.to_string(), tx, CancellationToken::new());
        (client, rx)
    }

    #[tokio::test]
    async fn test_room_creation() {
        let room = Room::new(RoomId::from("r1"));

        assert_eq!(room.id, RoomId::from("r1"));
        assert_eq!(room.member_count().await, 0);
        assert!(room.admin().await.is_none());
        assert!(!room.is_closed().await);
    }

    #[tokio::test]
    async fn test_only_first_joiner_is_admin() {
        let room = Room::new(RoomId::from("r1"));

        for (i, name) in ["Alice", "Bob", "Carol", "Dave"].iter().enumerate() {
            let (client, _rx) = member(name);
            let outcome = room.join(client).await.unwrap();
            assert_eq!(outcome.is_admin, i == 0, "{name}");
        }

        assert_eq!(room.admin().await.as_deref(), Some("Alice"));
        assert_eq!(room.member_count().await, 4);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let room = Room::new(RoomId::from("r1"));
        let (alice, _rx1) = member("Alice");
        let (alice2, _rx2) = member("Alice");
        room.join(alice).await.unwrap();

        let err = room.join(alice2).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername(name) if name == "Alice"));
        assert_eq!(room.member_count().await, 1);
    }

    #[tokio::test]
    async fn test_username_is_case_sensitive() {
        let room = Room::new(RoomId::from("r1"));
        let (alice, _rx1) = member("Alice");
        let (lower, _rx2) = member("alice");
        room.join(alice).await.unwrap();
        assert!(room.join(lower).await.is_ok());
    }

    #[tokio::test]
    async fn test_guest_leaves() {
        let room = Room::new(RoomId::from("r1"));
        let (alice, _rx1) = member("Alice");
        let (bob, _rx2) = member("Bob");
        let bob_id = bob.id;
        room.join(alice).await.unwrap();
        room.join(bob).await.unwrap();

        let outcome = room.leave(bob_id).await;
        assert_eq!(
            outcome,
            LeaveOutcome {
                was_member: true,
                was_admin: false,
                is_empty: false
            }
        );
        assert!(!outcome.closes_room());
        assert!(!outcome.empties_room());
        assert!(room.contains("Alice").await);
    }

    #[tokio::test]
    async fn test_admin_leaves() {
        let room = Room::new(RoomId::from("r1"));
        let (alice, _rx1) = member("Alice");
        let (bob, _rx2) = member("Bob");
        let alice_id = alice.id;
        room.join(alice).await.unwrap();
        room.join(bob).await.unwrap();

        let outcome = room.leave(alice_id).await;
        assert!(outcome.was_admin);
        assert!(outcome.closes_room());
    }

    #[tokio::test]
    async fn test_leave_is_idempotent() {
        let room = Room::new(RoomId::from("r1"));
        let (alice, _rx) = member("Alice");
        let alice_id = alice.id;
        room.join(alice).await.unwrap();

        assert!(room.leave(alice_id).await.was_member);
        let again = room.leave(alice_id).await;
        assert!(!again.was_member);
        assert!(!again.closes_room());
        assert!(!again.empties_room());
    }

    #[tokio::test]
    async fn test_snapshot_excludes_sender() {
        let room = Room::new(RoomId::from("r1"));
        let mut bob_id = None;
        for name in ["Alice", "Bob", "Carol"] {
            let (client, _rx) = member(name);
            if name == "Bob" {
                bob_id = Some(client.id);
            }
            room.join(client).await.unwrap();
        }

        let mut names: Vec<_> = room
            .snapshot_for(bob_id.unwrap())
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.username)
            .collect();
        names.sort();
        assert_eq!(names, vec!["Alice", "Carol"]);
    }

    #[tokio::test]
    async fn test_close_drains_once_and_blocks_joins() {
        let room = Room::new(RoomId::from("r1"));
        let (alice, _rx1) = member("Alice");
        let (bob, _rx2) = member("Bob");
        room.join(alice).await.unwrap();
        room.join(bob).await.unwrap();

        assert_eq!(room.close().await.len(), 2);
        assert!(room.close().await.is_empty());
        assert_eq!(room.member_count().await, 0);
        assert!(room.admin().await.is_none());

        let (carol, _rx3) = member("Carol");
        assert!(matches!(
            room.join(carol).await,
            Err(AppError::RoomNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_no_snapshot_for_departed_member() {
        let room = Room::new(RoomId::from("r1"));
        let (alice, _rx1) = member("Alice");
        let (bob, _rx2) = member("Bob");
        let bob_id = bob.id;
        room.join(alice).await.unwrap();
        room.join(bob).await.unwrap();

        room.leave(bob_id).await;
        assert!(room.snapshot_for(bob_id).await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_same_username_admit_one() {
        let room = Arc::new(Room::new(RoomId::from("r1")));
        let mut receivers = Vec::new();
        let mut tasks = Vec::new();
        for _ in 0..32 {
            let (client, rx) = member("Alice");
            receivers.push(rx);
            let room = room.clone();
            tasks.push(tokio::spawn(async move { room.join(client).await }));
        }

        let mut admitted = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(outcome) => {
                    admitted += 1;
                    assert!(outcome.is_admin);
                }
                Err(e) => assert!(matches!(e, AppError::DuplicateUsername(_))),
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(room.member_count().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_distinct_joins_elect_one_admin() {
        let room = Arc::new(Room::new(RoomId::from("r1")));
        let mut receivers = Vec::new();
        let mut tasks = Vec::new();
        for i in 0..32 {
            let (client, rx) = member(&format!("user{i}"));
            receivers.push(rx);
            let room = room.clone();
            tasks.push(tokio::spawn(async move {
                let name = client.username.clone();
                (name, room.join(client).await.unwrap())
            }));
        }

        let mut admins = Vec::new();
        for task in tasks {
            let (name, outcome) = task.await.unwrap();
            if outcome.is_admin {
                admins.push(name);
            }
        }
        assert_eq!(admins.len(), 1);
        assert_eq!(room.admin().await.as_ref(), admins.first());
        assert_eq!(room.member_count().await, 32);
    }
}
