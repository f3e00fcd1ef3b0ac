//! In-memory connection registry.
//!
//! Maps live connection ids to sessions. This is process-lifetime state with
//! no persistence; it resets on restart. All mutation goes through one
//! `RwLock` so member-list reads always observe a consistent snapshot, and
//! the lock is never held across a persistence call.

use std::collections::HashMap;

use domain::{ConnectionId, Identity, Session, Timestamp, UserId};
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Default)]
pub struct ConnectionRegistry {
    sessions: RwLock<HashMap<ConnectionId, Session>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session for a connection. A reused connection id
    /// overwrites the prior session (last-write-wins).
    pub async fn register(
        &self,
        connection_id: ConnectionId,
        identity: Identity,
        room: String,
        connected_at: Timestamp,
    ) -> Session {
        let session = Session::new(connection_id, identity, room, connected_at);
        let mut sessions = self.sessions.write().await;
        if sessions.insert(connection_id, session.clone()).is_some() {
            debug!(%connection_id, "session overwritten for reused connection id");
        }
        info!(%connection_id, user = %session.identity.display_name(), room = %session.room, "session registered");
        session
    }

    /// Removes and returns the session. Unknown ids are a no-op.
    pub async fn unregister(&self, connection_id: ConnectionId) -> Option<Session> {
        let removed = self.sessions.write().await.remove(&connection_id);
        if let Some(session) = &removed {
            info!(%connection_id, user = %session.identity.display_name(), "session unregistered");
        }
        removed
    }

    /// Moves a session to a new room, returning the updated session.
    pub async fn update_room(
        &self,
        connection_id: ConnectionId,
        new_room: String,
    ) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&connection_id)?;
        session.room = new_room;
        Some(session.clone())
    }

    pub async fn lookup(&self, connection_id: ConnectionId) -> Option<Session> {
        self.sessions.read().await.get(&connection_id).cloned()
    }

    /// Sessions currently in `room`, ordered by connect time then id so
    /// member lists are stable across broadcasts.
    pub async fn list_by_room(&self, room: &str) -> Vec<Session> {
        let sessions = self.sessions.read().await;
        let mut members: Vec<Session> = sessions
            .values()
            .filter(|s| s.room == room)
            .cloned()
            .collect();
        members.sort_by(|a, b| {
            a.connected_at
                .cmp(&b.connected_at)
                .then(a.connection_id.cmp(&b.connection_id))
        });
        members
    }

    /// Every live connection of a registered user. Private-message delivery
    /// resolves recipients by identity, not connection id, since a recipient
    /// may have reconnected under a new connection.
    pub async fn find_by_user(&self, user_id: UserId) -> Vec<Session> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.identity.user_id() == Some(user_id))
            .cloned()
            .collect()
    }

    pub async fn connection_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether a registered user has at least one live connection.
    pub async fn is_user_connected(&self, user_id: UserId) -> bool {
        self.sessions
            .read()
            .await
            .values()
            .any(|s| s.identity.user_id() == Some(user_id))
    }
}
