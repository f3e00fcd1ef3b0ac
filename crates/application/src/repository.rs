//! Storage collaborator interface.
//!
//! The coordination core treats persistence as an external service reached
//! through these traits; PostgreSQL implementations live in the
//! infrastructure crate and tests substitute in-memory ones.

use async_trait::async_trait;
use domain::{Message, MessageId, Room, RoomId, Timestamp, User, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(String),
}

impl RepositoryError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn update(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    /// Public profile listing, password hashes never leave the repository
    /// serialized anyway.
    async fn list(&self) -> Result<Vec<User>, RepositoryError>;
    async fn delete(&self, id: UserId) -> Result<(), RepositoryError>;
    /// Presence bookkeeping for registered users on identify/disconnect.
    async fn set_online(
        &self,
        id: UserId,
        is_online: bool,
        last_seen: Timestamp,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn create(&self, room: Room) -> Result<Room, RepositoryError>;
    async fn update(&self, room: Room) -> Result<Room, RepositoryError>;
    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Room>, RepositoryError>;
    /// Public rooms, oldest first.
    async fn list_public(&self) -> Result<Vec<Room>, RepositoryError>;
    async fn list_by_creator(&self, creator: UserId) -> Result<Vec<Room>, RepositoryError>;
    async fn delete(&self, id: RoomId) -> Result<(), RepositoryError>;
    /// Pulls a user out of every member/admin list (admin user deletion).
    async fn remove_user_everywhere(&self, user: UserId) -> Result<(), RepositoryError>;
}

/// Filters for the admin message audit view.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub room: Option<String>,
    /// Case-insensitive content substring.
    pub search: Option<String>,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub total: u64,
}

/// Bulk deletion: either an explicit id list, or a room with an optional
/// creation-time range.
#[derive(Debug, Clone, Default)]
pub struct BulkDeleteFilter {
    pub ids: Vec<MessageId>,
    pub room: Option<String>,
    pub range: Option<(Timestamp, Timestamp)>,
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError>;
    async fn update(&self, message: Message) -> Result<Message, RepositoryError>;
    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError>;
    /// Most recent non-private messages of a room, newest first.
    async fn list_recent_public(
        &self,
        room: &str,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError>;
    /// Paginated room history, newest first.
    async fn list_public_page(
        &self,
        room: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError>;
    /// Full private conversation between two identities, oldest first.
    async fn list_private_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Vec<Message>, RepositoryError>;
    /// Admin audit listing across rooms and private messages.
    async fn search(&self, filter: MessageFilter) -> Result<MessagePage, RepositoryError>;
    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError>;
    /// Returns the deleted messages so callers can notify affected rooms.
    async fn bulk_delete(&self, filter: BulkDeleteFilter)
        -> Result<Vec<Message>, RepositoryError>;
    async fn delete_by_sender(&self, sender: UserId) -> Result<u64, RepositoryError>;
    async fn delete_by_room(&self, room: &str) -> Result<u64, RepositoryError>;
    async fn count_by_sender(&self, sender: UserId) -> Result<u64, RepositoryError>;
    async fn count_public_in_room(&self, room: &str) -> Result<u64, RepositoryError>;
}
