use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{MessageId, Timestamp, UserId};

/// Message attribution. A stored message carries either a registered user
/// reference or an ephemeral guest display name, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Sender {
    Registered { user_id: UserId, username: String },
    Guest { display_name: String },
}

impl Sender {
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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    File,
}

impl Default for MessageKind {
    fn default() -> Self {
        Self::Text
    }
}

/// Reference to an already-uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub file_name: String,
}

/// A single emoji reaction. At most one per identity per message; a newer
/// reaction from the same identity replaces the older one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub user_id: UserId,
    pub emoji: String,
}

/// A chat message. Public messages target exactly one room; private messages
/// target exactly one recipient and no room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub content: String,
    pub room: Option<String>,
    pub recipient: Option<UserId>,
    pub kind: MessageKind,
    pub attachment: Option<Attachment>,
    pub reactions: Vec<Reaction>,
    pub created_at: Timestamp,
}

impl Message {
    /// Creates a room-scoped message. Content must be non-empty after trim.
    pub fn public(
        id: MessageId,
        sender: Sender,
        content: String,
        room: String,
        kind: MessageKind,
        attachment: Option<Attachment>,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        if content.trim().is_empty() {
            return Err(DomainError::validation(
                "content",
                "message content is required",
            ));
        }
        Ok(Self {
            id,
            sender,
            content,
            room: Some(room),
            recipient: None,
            kind,
            attachment,
            reactions: Vec::new(),
            created_at,
        })
    }

    /// Creates a direct message to a single recipient, with no room.
    pub fn private(
        id: MessageId,
        sender: Sender,
        content: String,
        recipient: UserId,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            sender,
            content,
            room: None,
            recipient: Some(recipient),
            kind: MessageKind::Text,
            attachment: None,
            reactions: Vec::new(),
            created_at,
        }
    }

    pub fn is_private(&self) -> bool {
        self.recipient.is_some()
    }

    /// Records a reaction, replacing any prior reaction by the same identity.
    pub fn react(&mut self, user_id: UserId, emoji: String) {
        self.reactions.retain(|r| r.user_id != user_id);
        self.reactions.push(Reaction { user_id, emoji });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sender() -> Sender {
        Sender::Registered {
            user_id: UserId::new(Uuid::new_v4()),
            username: "alice".to_string(),
        }
    }

    #[test]
    fn public_message_rejects_blank_content() {
        let err = Message::public(
            MessageId::new(Uuid::new_v4()),
            sender(),
            "   ".to_string(),
            "general".to_string(),
            MessageKind::Text,
            None,
            chrono::Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn reaction_replaces_prior_from_same_identity() {
        let user = UserId::new(Uuid::new_v4());
        let mut message = Message::public(
            MessageId::new(Uuid::new_v4()),
            sender(),
            "hi".to_string(),
            "general".to_string(),
            MessageKind::Text,
            None,
            chrono::Utc::now(),
        )
        .unwrap();

        message.react(user, "👍".to_string());
        message.react(user, "❤️".to_string());

        assert_eq!(message.reactions.len(), 1);
        assert_eq!(message.reactions[0].emoji, "❤️");
    }

    #[test]
    fn private_message_has_recipient_and_no_room() {
        let recipient = UserId::new(Uuid::new_v4());
        let message = Message::private(
            MessageId::new(Uuid::new_v4()),
            sender(),
            "psst".to_string(),
            recipient,
            chrono::Utc::now(),
        );
        assert!(message.is_private());
        assert_eq!(message.recipient, Some(recipient));
        assert!(message.room.is_none());
    }
}
