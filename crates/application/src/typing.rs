//! Per-room typing state.
//!
//! Ephemeral, client-driven: an entry appears on a "typing started" signal
//! and disappears on "typing stopped" or on disconnect. The server does not
//! enforce its own expiry; a client that vanishes without a clean stop
//! signal is only cleaned up by the disconnect sweep.

use std::collections::HashMap;

use domain::ConnectionId;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct TypingTracker {
    // room -> (connection -> display name)
    rooms: RwLock<HashMap<String, HashMap<ConnectionId, String>>>,
}

impl TypingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records or clears a typing signal. Clearing is idempotent: a `false`
    /// with no prior `true` is accepted silently.
    pub async fn set_typing(
        &self,
        connection_id: ConnectionId,
        room: &str,
        display_name: &str,
        is_typing: bool,
    ) {
        let mut rooms = self.rooms.write().await;
        if is_typing {
            rooms
                .entry(room.to_string())
                .or_default()
                .insert(connection_id, display_name.to_string());
        } else if let Some(entries) = rooms.get_mut(room) {
            entries.remove(&connection_id);
            if entries.is_empty() {
                rooms.remove(room);
            }
        }
    }

    /// Display names currently typing in a room.
    pub async fn typing_names(&self, room: &str) -> Vec<String> {
        let rooms = self.rooms.read().await;
        let mut names: Vec<String> = rooms
            .get(room)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Removes a connection from every room's typing set and returns the
    /// rooms that actually changed, so callers can rebroadcast their lists.
    pub async fn remove_connection(&self, connection_id: ConnectionId) -> Vec<String> {
        let mut rooms = self.rooms.write().await;
        let mut affected = Vec::new();
        rooms.retain(|room, entries| {
            if entries.remove(&connection_id).is_some() {
                affected.push(room.clone());
            }
            !entries.is_empty()
        });
        affected
    }
}
