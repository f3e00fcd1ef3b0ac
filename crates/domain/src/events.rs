//! Server-to-client event vocabulary for the socket protocol.
//!
//! Event names match the original wire format the web client speaks
//! (`user_list`, `receive_message`, ...), derived from the variant names by
//! serde's snake_case rename.

use serde::{Deserialize, Serialize};

use crate::message::{Attachment, Message, MessageKind, Reaction};
use crate::room::Room;
use crate::session::Session;
use crate::value_objects::{MessageId, UserId};

/// Everything a client may send up a live connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Identify handshake: a JWT for registered users or a display name for
    /// guests. Room defaults to "general".
    UserJoin {
        token: Option<String>,
        username: Option<String>,
        room: Option<String>,
    },
    SendMessage {
        content: String,
        room: Option<String>,
        kind: Option<MessageKind>,
        attachment: Option<Attachment>,
    },
    PrivateMessage {
        recipient_id: UserId,
        content: String,
    },
    Typing {
        room: String,
        is_typing: bool,
    },
    AddReaction {
        message_id: MessageId,
        emoji: String,
    },
    JoinRoom {
        room: String,
    },
    CreateRoom {
        name: String,
        description: Option<String>,
        is_private: Option<bool>,
    },
}

/// One entry in a room's "who's here" view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMember {
    pub username: String,
    pub is_guest: bool,
    pub user_id: Option<UserId>,
    pub room: String,
}

impl From<&Session> for RoomMember {
    fn from(session: &Session) -> Self {
        Self {
            username: session.identity.display_name().to_string(),
            is_guest: session.identity.is_guest(),
            user_id: session.identity.user_id(),
            room: session.room.clone(),
        }
    }
}

/// Everything the server pushes down a live connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// History replay, sent once per join to the joining connection only.
    RoomMessages { messages: Vec<Message> },
    /// Canonical member list, sent to the whole room on membership change.
    UserList { room: String, users: Vec<RoomMember> },
    UserJoined { username: String, room: String },
    UserLeft { username: String, room: String },
    /// Room-scoped broadcast of a persisted public message.
    ReceiveMessage { message: Message },
    /// Sender-only acknowledgement of a successful send.
    MessageSent { message_id: MessageId },
    /// Delivered to sender and recipient only.
    PrivateMessage { message: Message },
    /// Excludes the typer itself.
    TypingUsers { room: String, users: Vec<String> },
    ReactionAdded {
        message_id: MessageId,
        reactions: Vec<Reaction>,
    },
    /// Process-wide notice, not room-scoped.
    RoomCreated { room: Room },
    /// Creator-only acknowledgement.
    RoomCreatedSuccess { room: Room },
    MessageDeleted { message_id: MessageId },
    MessagesBulkDeleted { room: String, count: u64 },
    AccountDeleted { message: String },
    /// Sender-only failure notice; never broadcast.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_use_original_wire_names() {
        let event = ServerEvent::TypingUsers {
            room: "general".to_string(),
            users: vec!["alice".to_string()],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "typing_users");
        assert_eq!(json["data"]["room"], "general");
    }
}
