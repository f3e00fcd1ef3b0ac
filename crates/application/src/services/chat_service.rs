//! Room coordination and message routing.
//!
//! One inbound socket event maps to one method here. Handlers run to
//! completion relative to their own connection; persistence calls are the
//! only suspension points, and the in-memory maps are never locked across
//! them. Persistence success is the commit point — broadcasts after it are
//! best-effort, and a client that misses one recovers via the history
//! replay on its next join.

use std::sync::Arc;

use domain::{
    Attachment, ClientEvent, ConnectionId, Identity, Message, MessageId, MessageKind, Room,
    RoomId, RoomName, ServerEvent, UserId,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::TokenVerifier;
use crate::clock::Clock;
use crate::delivery::EventSinkRegistry;
use crate::error::{ApplicationError, ApplicationResult};
use crate::presence::Presence;
use crate::registry::ConnectionRegistry;
use crate::repository::{MessageRepository, RoomRepository, UserRepository};
use crate::typing::TypingTracker;

/// How many messages a joining connection gets replayed.
const HISTORY_REPLAY_LIMIT: u32 = 50;

const DEFAULT_ROOM: &str = "general";

pub struct ChatServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub room_repository: Arc<dyn RoomRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub token_verifier: Arc<dyn TokenVerifier>,
    pub clock: Arc<dyn Clock>,
    pub registry: Arc<ConnectionRegistry>,
    pub typing: Arc<TypingTracker>,
    pub sinks: Arc<EventSinkRegistry>,
    pub presence: Arc<Presence>,
}

pub struct ChatService {
    deps: ChatServiceDependencies,
}

/// Room listing entry for the HTTP directory.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RoomSummary {
    #[serde(flatten)]
    pub room: Room,
    pub member_count: usize,
    pub message_count: u64,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    /// Wires up the outbound channel for a fresh connection. Must happen
    /// before the first inbound event so error replies have somewhere to go.
    pub async fn attach(
        &self,
        connection_id: ConnectionId,
        sender: tokio::sync::mpsc::UnboundedSender<ServerEvent>,
    ) {
        self.deps.sinks.register(connection_id, sender).await;
    }

    /// Dispatches one inbound event. Failures are reported to the
    /// originating connection only; nothing here is fatal to the loop.
    pub async fn handle(&self, connection_id: ConnectionId, event: ClientEvent) {
        let result = match event {
            ClientEvent::UserJoin {
                token,
                username,
                room,
            } => self.identify(connection_id, token, username, room).await,
            ClientEvent::SendMessage {
                content,
                room,
                kind,
                attachment,
            } => {
                self.send_public(connection_id, content, room, kind, attachment)
                    .await
            }
            ClientEvent::PrivateMessage {
                recipient_id,
                content,
            } => self.send_private(connection_id, recipient_id, content).await,
            ClientEvent::Typing { room, is_typing } => {
                self.set_typing(connection_id, room, is_typing).await
            }
            ClientEvent::AddReaction { message_id, emoji } => {
                self.add_reaction(connection_id, message_id, emoji).await
            }
            ClientEvent::JoinRoom { room } => self.join_room(connection_id, room).await,
            ClientEvent::CreateRoom {
                name,
                description,
                is_private,
            } => {
                self.create_room(connection_id, name, description, is_private)
                    .await
            }
        };

        if let Err(err) = result {
            warn!(%connection_id, error = %err, "socket event failed");
            self.deps
                .sinks
                .send_to(
                    connection_id,
                    ServerEvent::Error {
                        message: err.to_string(),
                    },
                )
                .await;
        }
    }

    /// Identify handshake: resolves the identity, registers the session,
    /// replays history and announces the arrival.
    pub async fn identify(
        &self,
        connection_id: ConnectionId,
        token: Option<String>,
        username: Option<String>,
        room: Option<String>,
    ) -> ApplicationResult<()> {
        let room = room.unwrap_or_else(|| DEFAULT_ROOM.to_string());
        let identity = self.resolve_identity(token, username).await?;

        if let Some(user_id) = identity.user_id() {
            self.deps
                .user_repository
                .set_online(user_id, true, self.deps.clock.now())
                .await?;
        }

        let session = self
            .deps
            .registry
            .register(
                connection_id,
                identity,
                room.clone(),
                self.deps.clock.now(),
            )
            .await;

        info!(user = %session.identity.display_name(), %room, "user joined");

        // Replay failure is reported but does not undo the registration;
        // the client can recover by rejoining.
        if let Err(err) = self.replay_history(connection_id, &room).await {
            warn!(%connection_id, error = %err, "history replay failed");
            self.deps
                .sinks
                .send_to(
                    connection_id,
                    ServerEvent::Error {
                        message: err.to_string(),
                    },
                )
                .await;
        }

        self.deps.presence.broadcast_roster(&room).await;
        self.deps
            .presence
            .send_to_room(
                &room,
                ServerEvent::UserJoined {
                    username: session.identity.display_name().to_string(),
                    room: room.clone(),
                },
            )
            .await;
        Ok(())
    }

    async fn resolve_identity(
        &self,
        token: Option<String>,
        username: Option<String>,
    ) -> ApplicationResult<Identity> {
        if let Some(token) = token {
            let user_id = self.deps.token_verifier.verify(&token)?;
            let user = self
                .deps
                .user_repository
                .find_by_id(user_id)
                .await?
                .ok_or_else(|| ApplicationError::authentication("Authentication failed"))?;
            return Ok(Identity::Registered {
                user_id: user.id,
                username: user.username,
            });
        }

        let display_name = username.map(|n| n.trim().to_string()).unwrap_or_default();
        if display_name.is_empty() {
            return Err(ApplicationError::validation(
                "a token or a guest username is required",
            ));
        }
        Ok(Identity::Guest { display_name })
    }

    /// Moves a connection between rooms. Joining the current room (exact
    /// string match) is a no-op. Room names are not validated here — only
    /// room *creation* validates; joining a never-created name is accepted.
    pub async fn join_room(
        &self,
        connection_id: ConnectionId,
        room: String,
    ) -> ApplicationResult<()> {
        let session = self
            .deps
            .registry
            .lookup(connection_id)
            .await
            .ok_or_else(|| ApplicationError::not_found("User not found"))?;

        if session.room == room {
            return Ok(());
        }

        let old_room = session.room.clone();
        self.deps
            .presence
            .send_to_room_except(
                &old_room,
                connection_id,
                ServerEvent::UserLeft {
                    username: session.identity.display_name().to_string(),
                    room: old_room.clone(),
                },
            )
            .await;

        self.deps
            .registry
            .update_room(connection_id, room.clone())
            .await;
        self.deps.presence.broadcast_roster(&old_room).await;

        info!(user = %session.identity.display_name(), from = %old_room, to = %room, "room switch");

        // The registry move above is not rolled back on replay failure.
        if let Err(err) = self.replay_history(connection_id, &room).await {
            warn!(%connection_id, error = %err, "history replay failed");
            self.deps
                .sinks
                .send_to(
                    connection_id,
                    ServerEvent::Error {
                        message: err.to_string(),
                    },
                )
                .await;
        }

        self.deps.presence.broadcast_roster(&room).await;
        self.deps
            .presence
            .send_to_room(
                &room,
                ServerEvent::UserJoined {
                    username: session.identity.display_name().to_string(),
                    room: room.clone(),
                },
            )
            .await;
        Ok(())
    }

    /// Last 50 non-private messages, delivered oldest-to-newest to the
    /// joining connection only.
    async fn replay_history(
        &self,
        connection_id: ConnectionId,
        room: &str,
    ) -> ApplicationResult<()> {
        let mut messages = self
            .deps
            .message_repository
            .list_recent_public(room, HISTORY_REPLAY_LIMIT)
            .await?;
        messages.reverse();
        self.deps
            .sinks
            .send_to(connection_id, ServerEvent::RoomMessages { messages })
            .await;
        Ok(())
    }

    /// Persists and fans out a public message. Persistence is the commit
    /// point; a storage failure is reported to the sender and nothing is
    /// broadcast.
    pub async fn send_public(
        &self,
        connection_id: ConnectionId,
        content: String,
        room: Option<String>,
        kind: Option<MessageKind>,
        attachment: Option<Attachment>,
    ) -> ApplicationResult<()> {
        let session = self
            .deps
            .registry
            .lookup(connection_id)
            .await
            .ok_or_else(|| ApplicationError::not_found("User not found"))?;

        let room = room.unwrap_or_else(|| session.room.clone());
        let message = Message::public(
            MessageId::new(Uuid::new_v4()),
            session.identity.as_sender(),
            content,
            room,
            kind.unwrap_or_default(),
            attachment,
            self.deps.clock.now(),
        )?;

        let stored = self.deps.message_repository.create(message).await?;
        let target_room = stored.room.clone().unwrap_or_default();

        self.deps
            .presence
            .send_to_room(
                &target_room,
                ServerEvent::ReceiveMessage {
                    message: stored.clone(),
                },
            )
            .await;
        self.deps
            .sinks
            .send_to(
                connection_id,
                ServerEvent::MessageSent {
                    message_id: stored.id,
                },
            )
            .await;
        Ok(())
    }

    /// Persists a direct message and delivers it to the recipient's live
    /// connections (looked up by identity, not connection id) plus the
    /// sender. An offline recipient still gets the persisted copy later.
    pub async fn send_private(
        &self,
        connection_id: ConnectionId,
        recipient_id: UserId,
        content: String,
    ) -> ApplicationResult<()> {
        let session = self
            .deps
            .registry
            .lookup(connection_id)
            .await
            .ok_or_else(|| ApplicationError::not_found("User not found"))?;

        let message = Message::private(
            MessageId::new(Uuid::new_v4()),
            session.identity.as_sender(),
            content,
            recipient_id,
            self.deps.clock.now(),
        );
        let stored = self.deps.message_repository.create(message).await?;

        let event = ServerEvent::PrivateMessage {
            message: stored.clone(),
        };
        let recipient_connections: Vec<ConnectionId> = self
            .deps
            .registry
            .find_by_user(recipient_id)
            .await
            .iter()
            .map(|s| s.connection_id)
            .filter(|id| *id != connection_id)
            .collect();
        self.deps
            .sinks
            .send_to_many(&recipient_connections, event.clone())
            .await;
        self.deps.sinks.send_to(connection_id, event).await;
        Ok(())
    }

    /// Updates the typing set and pushes the aggregated name list to every
    /// *other* member of the room — the typer already knows.
    pub async fn set_typing(
        &self,
        connection_id: ConnectionId,
        room: String,
        is_typing: bool,
    ) -> ApplicationResult<()> {
        // Typing signals from unidentified connections are dropped silently;
        // they are too chatty to answer with error events.
        let Some(session) = self.deps.registry.lookup(connection_id).await else {
            return Ok(());
        };

        self.deps
            .typing
            .set_typing(
                connection_id,
                &room,
                session.identity.display_name(),
                is_typing,
            )
            .await;

        let users = self.deps.typing.typing_names(&room).await;
        self.deps
            .presence
            .send_to_room_except(
                &room,
                connection_id,
                ServerEvent::TypingUsers {
                    room: room.clone(),
                    users,
                },
            )
            .await;
        Ok(())
    }

    /// One reaction per identity: a newer emoji replaces the older one.
    /// Guests cannot react and missing messages are ignored — both silently,
    /// mirroring the permission model rather than erroring.
    pub async fn add_reaction(
        &self,
        connection_id: ConnectionId,
        message_id: MessageId,
        emoji: String,
    ) -> ApplicationResult<()> {
        let Some(session) = self.deps.registry.lookup(connection_id).await else {
            return Ok(());
        };
        let Some(user_id) = session.identity.user_id() else {
            return Ok(());
        };
        let Some(mut message) = self.deps.message_repository.find_by_id(message_id).await? else {
            return Ok(());
        };

        message.react(user_id, emoji);
        let stored = self.deps.message_repository.update(message).await?;

        if let Some(room) = &stored.room {
            self.deps
                .presence
                .send_to_room(
                    room,
                    ServerEvent::ReactionAdded {
                        message_id: stored.id,
                        reactions: stored.reactions.clone(),
                    },
                )
                .await;
        }
        Ok(())
    }

    /// Validates and persists a room record, then announces it to every
    /// connection process-wide. This is the only place room names are
    /// validated. Shared by the socket and HTTP creation paths.
    pub async fn create_room_record(
        &self,
        creator: Option<UserId>,
        name: String,
        description: Option<String>,
        is_private: bool,
    ) -> ApplicationResult<Room> {
        let name = RoomName::parse(&name)?;
        if self
            .deps
            .room_repository
            .find_by_name(name.as_str())
            .await?
            .is_some()
        {
            return Err(ApplicationError::validation("Room name already exists"));
        }

        let room = Room::new(
            RoomId::new(Uuid::new_v4()),
            name,
            description,
            is_private,
            creator,
            self.deps.clock.now(),
        );
        let stored = self.deps.room_repository.create(room).await?;

        info!(room = %stored.name, "room created");

        self.deps
            .sinks
            .broadcast_all(ServerEvent::RoomCreated {
                room: stored.clone(),
            })
            .await;
        Ok(stored)
    }

    pub async fn create_room(
        &self,
        connection_id: ConnectionId,
        name: String,
        description: Option<String>,
        is_private: Option<bool>,
    ) -> ApplicationResult<()> {
        let session = self
            .deps
            .registry
            .lookup(connection_id)
            .await
            .ok_or_else(|| ApplicationError::not_found("User not found"))?;

        let stored = self
            .create_room_record(
                session.identity.user_id(),
                name,
                description,
                is_private.unwrap_or(false),
            )
            .await?;

        self.deps
            .sinks
            .send_to(connection_id, ServerEvent::RoomCreatedSuccess { room: stored })
            .await;
        Ok(())
    }

    /// Tears down everything a closed connection owned: registry entry,
    /// typing entries in every room, the outbound sink. The vacated room
    /// gets exactly one presence broadcast.
    pub async fn disconnect(&self, connection_id: ConnectionId) {
        if let Some(session) = self.deps.registry.unregister(connection_id).await {
            if let Some(user_id) = session.identity.user_id() {
                // Cleanup path: persistence failures are logged, not surfaced.
                if let Err(err) = self
                    .deps
                    .user_repository
                    .set_online(user_id, false, self.deps.clock.now())
                    .await
                {
                    warn!(%user_id, error = %err, "failed to mark user offline");
                }
            }

            self.deps
                .presence
                .send_to_room(
                    &session.room,
                    ServerEvent::UserLeft {
                        username: session.identity.display_name().to_string(),
                        room: session.room.clone(),
                    },
                )
                .await;
            self.deps.presence.broadcast_roster(&session.room).await;

            info!(user = %session.identity.display_name(), room = %session.room, "user disconnected");
        }

        for room in self.deps.typing.remove_connection(connection_id).await {
            let users = self.deps.typing.typing_names(&room).await;
            self.deps
                .presence
                .send_to_room(&room, ServerEvent::TypingUsers { room: room.clone(), users })
                .await;
        }

        self.deps.sinks.unregister(connection_id).await;
    }

    // ---- HTTP read paths ----

    /// Paginated room history for the REST endpoint, oldest first within
    /// the page.
    pub async fn room_history(
        &self,
        room: &str,
        page: u32,
        limit: u32,
    ) -> ApplicationResult<Vec<Message>> {
        let mut messages = self
            .deps
            .message_repository
            .list_public_page(room, page, limit)
            .await?;
        messages.reverse();
        Ok(messages)
    }

    /// Full private conversation between two identities, oldest first.
    pub async fn private_conversation(
        &self,
        a: UserId,
        b: UserId,
    ) -> ApplicationResult<Vec<Message>> {
        Ok(self
            .deps
            .message_repository
            .list_private_between(a, b)
            .await?)
    }

    /// Public room directory with per-room message counts.
    pub async fn list_rooms(&self) -> ApplicationResult<Vec<RoomSummary>> {
        let rooms = self.deps.room_repository.list_public().await?;
        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms {
            let message_count = self
                .deps
                .message_repository
                .count_public_in_room(room.name.as_str())
                .await?;
            summaries.push(RoomSummary {
                member_count: room.member_count(),
                message_count,
                room,
            });
        }
        Ok(summaries)
    }
}
