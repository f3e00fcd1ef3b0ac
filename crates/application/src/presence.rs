//! Room presence projection.
//!
//! A pure read over the connection registry: the member list of a room is
//! whatever sessions point at it right now. The only responsibility here is
//! *when* to publish — synchronously on every membership-affecting event,
//! never batched or debounced. Two near-simultaneous joins may each publish
//! a list missing the other by one cycle; the next publish converges.

use std::sync::Arc;

use domain::{RoomMember, ServerEvent};

use crate::delivery::EventSinkRegistry;
use crate::registry::ConnectionRegistry;

pub struct Presence {
    registry: Arc<ConnectionRegistry>,
    sinks: Arc<EventSinkRegistry>,
}

impl Presence {
    pub fn new(registry: Arc<ConnectionRegistry>, sinks: Arc<EventSinkRegistry>) -> Self {
        Self { registry, sinks }
    }

    /// Pushes the canonical member list to everyone currently in the room.
    pub async fn broadcast_roster(&self, room: &str) {
        let sessions = self.registry.list_by_room(room).await;
        let users: Vec<RoomMember> = sessions.iter().map(RoomMember::from).collect();
        let targets: Vec<_> = sessions.iter().map(|s| s.connection_id).collect();
        self.sinks
            .send_to_many(
                &targets,
                ServerEvent::UserList {
                    room: room.to_string(),
                    users,
                },
            )
            .await;
    }

    /// Room-scoped push to every current member.
    pub async fn send_to_room(&self, room: &str, event: ServerEvent) {
        let targets: Vec<_> = self
            .registry
            .list_by_room(room)
            .await
            .iter()
            .map(|s| s.connection_id)
            .collect();
        self.sinks.send_to_many(&targets, event).await;
    }

    /// Room-scoped push excluding one connection (typing notices).
    pub async fn send_to_room_except(
        &self,
        room: &str,
        excluded: domain::ConnectionId,
        event: ServerEvent,
    ) {
        let targets: Vec<_> = self
            .registry
            .list_by_room(room)
            .await
            .iter()
            .map(|s| s.connection_id)
            .filter(|id| *id != excluded)
            .collect();
        self.sinks.send_to_many(&targets, event).await;
    }
}
