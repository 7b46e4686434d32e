//! Realtime connection registry.
//!
//! Maps a user id to at most one live connection (last connection wins) plus
//! the set of rooms that connection has joined. Everything is guarded by a
//! single mutex; delivery is an enqueue onto the session's unbounded channel
//! so no registry operation ever blocks on a socket write. The registry is
//! transient process state, rebuilt empty on restart.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::RealtimePush;

struct Connection {
    id: Uuid,
    sender: UnboundedSender<String>,
    rooms: HashSet<String>,
}

/// Receiving side of one registered connection, owned by the session task.
pub struct ConnectionHandle {
    /// Identifies this registration; a replacement connection gets a new id.
    pub connection_id: Uuid,
    /// Frames pushed to this user. Closed when the registration is replaced.
    pub receiver: UnboundedReceiver<String>,
}

/// Process-wide registry of live duplex connections.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: Mutex<HashMap<String, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Connection>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a connection for `user_id`, replacing any previous one.
    ///
    /// The replaced connection's channel is dropped, which ends its session
    /// task; the old session must not deregister the new connection, hence
    /// the connection id in the handle.
    pub fn connect(&self, user_id: &str) -> ConnectionHandle {
        let (sender, receiver) = mpsc::unbounded_channel();
        let connection_id = Uuid::new_v4();
        let previous = self.lock().insert(
            user_id.to_string(),
            Connection {
                id: connection_id,
                sender,
                rooms: HashSet::new(),
            },
        );
        if previous.is_some() {
            debug!(user_id, "existing connection replaced");
        }
        ConnectionHandle {
            connection_id,
            receiver,
        }
    }

    /// Deregister, but only if `connection_id` still owns the slot. Safe to
    /// call after the registration has already been replaced or removed.
    pub fn disconnect(&self, user_id: &str, connection_id: Uuid) {
        let mut inner = self.lock();
        if inner
            .get(user_id)
            .is_some_and(|connection| connection.id == connection_id)
        {
            inner.remove(user_id);
        }
    }

    /// Whether `user_id` currently has a live connection.
    pub fn is_connected(&self, user_id: &str) -> bool {
        self.lock().contains_key(user_id)
    }

    /// Number of live connections.
    pub fn connected_count(&self) -> usize {
        self.lock().len()
    }

    /// Add `room` to the user's joined set. No-op when not connected.
    pub fn join_room(&self, user_id: &str, room: &str) {
        if let Some(connection) = self.lock().get_mut(user_id) {
            connection.rooms.insert(room.to_string());
        }
    }

    /// Remove `room` from the user's joined set.
    pub fn leave_room(&self, user_id: &str, room: &str) {
        if let Some(connection) = self.lock().get_mut(user_id) {
            connection.rooms.remove(room);
        }
    }

    /// Deliver `frame` to every connected user whose room set contains
    /// `room`. Users who joined and then disconnected receive nothing.
    pub fn broadcast_to_room(&self, room: &str, frame: &str) {
        let inner = self.lock();
        for connection in inner.values().filter(|c| c.rooms.contains(room)) {
            // A send failure means the session task is gone; disconnect
            // will reap the entry.
            let _ = connection.sender.send(frame.to_string());
        }
    }
}

impl RealtimePush for ConnectionRegistry {
    /// Best-effort direct delivery; frames for absent users are dropped.
    fn send_direct(&self, user_id: &str, frame: String) {
        if let Some(connection) = self.lock().get(user_id) {
            let _ = connection.sender.send(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn direct_delivery_reaches_the_live_connection() {
        let registry = ConnectionRegistry::new();
        let mut handle = registry.connect("u1");
        registry.send_direct("u1", "hello".to_string());
        assert_eq!(handle.receiver.recv().await, Some("hello".to_string()));
    }

    #[test]
    fn delivery_to_absent_users_is_silently_dropped() {
        let registry = ConnectionRegistry::new();
        registry.send_direct("nobody", "hello".to_string());
        assert_eq!(registry.connected_count(), 0);
    }

    #[tokio::test]
    async fn second_connection_replaces_the_first() {
        let registry = ConnectionRegistry::new();
        let mut first = registry.connect("u1");
        let mut second = registry.connect("u1");

        // The first channel is closed by the replacement.
        assert_eq!(first.receiver.recv().await, None);

        registry.send_direct("u1", "to-second".to_string());
        assert_eq!(second.receiver.recv().await, Some("to-second".to_string()));

        // The replaced session's disconnect must not evict the new one.
        registry.disconnect("u1", first.connection_id);
        assert!(registry.is_connected("u1"));
        registry.disconnect("u1", second.connection_id);
        assert!(!registry.is_connected("u1"));
    }

    #[test]
    fn disconnect_is_safe_when_already_absent() {
        let registry = ConnectionRegistry::new();
        let handle = registry.connect("u1");
        registry.disconnect("u1", handle.connection_id);
        registry.disconnect("u1", handle.connection_id);
        assert!(!registry.is_connected("u1"));
    }

    #[tokio::test]
    async fn room_broadcast_reaches_members_only() {
        let registry = ConnectionRegistry::new();
        let mut alice = registry.connect("alice");
        let mut bob = registry.connect("bob");
        let mut carol = registry.connect("carol");

        registry.join_room("alice", "dice");
        registry.join_room("bob", "dice");
        registry.join_room("carol", "other");

        registry.broadcast_to_room("dice", "roll!");
        assert_eq!(alice.receiver.recv().await, Some("roll!".to_string()));
        assert_eq!(bob.receiver.recv().await, Some("roll!".to_string()));
        assert!(carol.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn leaving_a_room_stops_broadcasts() {
        let registry = ConnectionRegistry::new();
        let mut alice = registry.connect("alice");
        registry.join_room("alice", "dice");
        registry.leave_room("alice", "dice");
        registry.broadcast_to_room("dice", "roll!");
        assert!(alice.receiver.try_recv().is_err());
    }

    #[test]
    fn disconnect_clears_room_membership() {
        let registry = ConnectionRegistry::new();
        let handle = registry.connect("alice");
        registry.join_room("alice", "dice");
        registry.disconnect("alice", handle.connection_id);

        // Reconnecting starts with an empty room set.
        let _handle = registry.connect("alice");
        let mut fresh = registry.connect("alice");
        registry.broadcast_to_room("dice", "roll!");
        assert!(fresh.receiver.try_recv().is_err());
    }
}
