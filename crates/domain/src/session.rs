use serde::{Deserialize, Serialize};

use crate::message::Sender;
use crate::value_objects::{ConnectionId, Timestamp, UserId};

/// Who is behind a connection. Resolved once during the identify handshake
/// and carried immutably on the session for the connection's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    Registered { user_id: UserId, username: String },
    Guest { display_name: String },
}

impl Identity {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Registered { username, .. } => username,
            Self::Guest { display_name } => display_name,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Registered { user_id, .. } => Some(*user_id),
            Self::Guest { .. } => None,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest { .. })
    }

    /// Message attribution for this identity.
    pub fn as_sender(&self) -> Sender {
        match self {
            Self::Registered { user_id, username } => Sender::Registered {
                user_id: *user_id,
                username: username.clone(),
            },
            Self::Guest { display_name } => Sender::Guest {
                display_name: display_name.clone(),
            },
        }
    }
}

/// Ephemeral per-connection record. Created on a successful identify
/// handshake, mutated on room switch, destroyed on disconnect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub identity: Identity,
    pub room: String,
    pub connected_at: Timestamp,
}

impl Session {
    pub fn new(
        connection_id: ConnectionId,
        identity: Identity,
        room: String,
        connected_at: Timestamp,
    ) -> Self {
        Self {
            connection_id,
            identity,
            room,
            connected_at,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.identity.is_guest()
    }
}
