//! In-memory repository implementations.
//!
//! Behaviorally equivalent to the PostgreSQL adapters for everything the
//! services exercise; used by service-level and end-to-end tests that run
//! without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use application::{
    BulkDeleteFilter, MessageFilter, MessagePage, MessageRepository, RepositoryError,
    RoomRepository, UserRepository,
};
use domain::{Message, MessageId, Room, RoomId, Timestamp, User, UserId};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(RepositoryError::conflict("record already exists"));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(RepositoryError::not_found("user"));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        self.users.write().await.remove(&id);
        Ok(())
    }

    async fn set_online(
        &self,
        id: UserId,
        is_online: bool,
        last_seen: Timestamp,
    ) -> Result<(), RepositoryError> {
        if let Some(user) = self.users.write().await.get_mut(&id) {
            user.is_online = is_online;
            user.last_seen = Some(last_seen);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryRoomRepository {
    rooms: RwLock<HashMap<RoomId, Room>>,
}

impl InMemoryRoomRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn create(&self, room: Room) -> Result<Room, RepositoryError> {
        let mut rooms = self.rooms.write().await;
        if rooms.values().any(|r| r.name == room.name) {
            return Err(RepositoryError::conflict("record already exists"));
        }
        rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn update(&self, room: Room) -> Result<Room, RepositoryError> {
        let mut rooms = self.rooms.write().await;
        if !rooms.contains_key(&room.id) {
            return Err(RepositoryError::not_found("room"));
        }
        rooms.insert(room.id, room.clone());
        Ok(room)
    }

    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError> {
        Ok(self.rooms.read().await.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Room>, RepositoryError> {
        Ok(self
            .rooms
            .read()
            .await
            .values()
            .find(|r| r.name.as_str() == name)
            .cloned())
    }

    async fn list_public(&self) -> Result<Vec<Room>, RepositoryError> {
        let mut rooms: Vec<Room> = self
            .rooms
            .read()
            .await
            .values()
            .filter(|r| !r.is_private)
            .cloned()
            .collect();
        rooms.sort_by_key(|r| r.created_at);
        Ok(rooms)
    }

    async fn list_by_creator(&self, creator: UserId) -> Result<Vec<Room>, RepositoryError> {
        let mut rooms: Vec<Room> = self
            .rooms
            .read()
            .await
            .values()
            .filter(|r| r.created_by == Some(creator))
            .cloned()
            .collect();
        rooms.sort_by_key(|r| r.created_at);
        Ok(rooms)
    }

    async fn delete(&self, id: RoomId) -> Result<(), RepositoryError> {
        self.rooms.write().await.remove(&id);
        Ok(())
    }

    async fn remove_user_everywhere(&self, user: UserId) -> Result<(), RepositoryError> {
        for room in self.rooms.write().await.values_mut() {
            room.members.retain(|id| *id != user);
            room.admins.retain(|id| *id != user);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: RwLock<Vec<Message>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    async fn update(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut messages = self.messages.write().await;
        match messages.iter_mut().find(|m| m.id == message.id) {
            Some(slot) => {
                *slot = message.clone();
                Ok(message)
            }
            None => Err(RepositoryError::not_found("message")),
        }
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn list_recent_public(
        &self,
        room: &str,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let mut matched: Vec<Message> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| !m.is_private() && m.room.as_deref() == Some(room))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched.truncate(limit as usize);
        Ok(matched)
    }

    async fn list_public_page(
        &self,
        room: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let mut matched: Vec<Message> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| !m.is_private() && m.room.as_deref() == Some(room))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let offset = page.saturating_sub(1) as usize * limit as usize;
        Ok(matched
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect())
    }

    async fn list_private_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let mut matched: Vec<Message> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| {
                let from = m.sender.user_id();
                (from == Some(a) && m.recipient == Some(b))
                    || (from == Some(b) && m.recipient == Some(a))
            })
            .cloned()
            .collect();
        matched.sort_by_key(|m| m.created_at);
        Ok(matched)
    }

    async fn search(&self, filter: MessageFilter) -> Result<MessagePage, RepositoryError> {
        let needle = filter.search.as_deref().map(str::to_lowercase);
        let mut matched: Vec<Message> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| {
                filter
                    .room
                    .as_deref()
                    .map_or(true, |room| m.room.as_deref() == Some(room))
            })
            .filter(|m| {
                needle
                    .as_deref()
                    .map_or(true, |s| m.content.to_lowercase().contains(s))
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matched.len() as u64;
        let limit = if filter.limit == 0 { 50 } else { filter.limit } as usize;
        let offset = filter.page.saturating_sub(1) as usize * limit;
        Ok(MessagePage {
            messages: matched.into_iter().skip(offset).take(limit).collect(),
            total,
        })
    }

    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError> {
        self.messages.write().await.retain(|m| m.id != id);
        Ok(())
    }

    async fn bulk_delete(
        &self,
        filter: BulkDeleteFilter,
    ) -> Result<Vec<Message>, RepositoryError> {
        let mut messages = self.messages.write().await;
        let matches: Box<dyn Fn(&Message) -> bool> = if !filter.ids.is_empty() {
            let ids = filter.ids.clone();
            Box::new(move |m: &Message| ids.contains(&m.id))
        } else if filter.room.is_some() || filter.range.is_some() {
            let room = filter.room.clone();
            let range = filter.range;
            Box::new(move |m: &Message| {
                room.as_deref().map_or(true, |r| m.room.as_deref() == Some(r))
                    && range.map_or(true, |(from, to)| m.created_at >= from && m.created_at <= to)
            })
        } else {
            return Ok(Vec::new());
        };
        let deleted: Vec<Message> = messages.iter().filter(|m| matches(m)).cloned().collect();
        messages.retain(|m| !matches(m));
        Ok(deleted)
    }

    async fn delete_by_sender(&self, sender: UserId) -> Result<u64, RepositoryError> {
        let mut messages = self.messages.write().await;
        let before = messages.len();
        messages.retain(|m| m.sender.user_id() != Some(sender));
        Ok((before - messages.len()) as u64)
    }

    async fn delete_by_room(&self, room: &str) -> Result<u64, RepositoryError> {
        let mut messages = self.messages.write().await;
        let before = messages.len();
        messages.retain(|m| m.room.as_deref() != Some(room));
        Ok((before - messages.len()) as u64)
    }

    async fn count_by_sender(&self, sender: UserId) -> Result<u64, RepositoryError> {
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.sender.user_id() == Some(sender))
            .count() as u64)
    }

    async fn count_public_in_room(&self, room: &str) -> Result<u64, RepositoryError> {
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| !m.is_private() && m.room.as_deref() == Some(room))
            .count() as u64)
    }
}
