//! Moderation operations behind the admin HTTP surface.
//!
//! Permission gating happens at the web layer; these methods assume the
//! caller is already authorized. Live connections affected by a moderation
//! action are notified through the same fan-out as chat traffic.

use std::collections::BTreeMap;
use std::sync::Arc;

use domain::{MessageId, Permissions, ServerEvent, User, UserId, UserRole};
use tracing::info;

use crate::delivery::EventSinkRegistry;
use crate::error::{ApplicationError, ApplicationResult};
use crate::presence::Presence;
use crate::registry::ConnectionRegistry;
use crate::repository::{
    BulkDeleteFilter, MessageFilter, MessagePage, MessageRepository, RoomRepository,
    UserRepository,
};

pub struct AdminServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub room_repository: Arc<dyn RoomRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub registry: Arc<ConnectionRegistry>,
    pub sinks: Arc<EventSinkRegistry>,
    pub presence: Arc<Presence>,
}

pub struct AdminService {
    deps: AdminServiceDependencies,
}

/// User row for the admin dashboard, with activity stats and a live flag.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AdminUserView {
    #[serde(flatten)]
    pub user: User,
    pub message_count: u64,
    pub rooms_created: usize,
    pub is_connected: bool,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct UpdateUserRequest {
    pub role: Option<UserRole>,
    pub permissions: Option<Permissions>,
}

impl AdminService {
    pub fn new(deps: AdminServiceDependencies) -> Self {
        Self { deps }
    }

    pub async fn list_users(&self) -> ApplicationResult<Vec<AdminUserView>> {
        let users = self.deps.user_repository.list().await?;
        let mut views = Vec::with_capacity(users.len());
        for user in users {
            let message_count = self.deps.message_repository.count_by_sender(user.id).await?;
            let rooms_created = self
                .deps
                .room_repository
                .list_by_creator(user.id)
                .await?
                .len();
            let is_connected = self.deps.registry.is_user_connected(user.id).await;
            views.push(AdminUserView {
                user,
                message_count,
                rooms_created,
                is_connected,
            });
        }
        Ok(views)
    }

    /// Deletes an account and everything it owned. Admin accounts cannot be
    /// deleted. An online target is told first, then its connections are
    /// dropped; the normal disconnect path handles presence cleanup.
    pub async fn delete_user(&self, user_id: UserId) -> ApplicationResult<()> {
        let user = self
            .deps
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("User not found"))?;
        if user.is_admin() {
            return Err(ApplicationError::validation("Cannot delete admin users"));
        }

        self.deps.message_repository.delete_by_sender(user_id).await?;
        self.deps.room_repository.remove_user_everywhere(user_id).await?;

        // Rooms the user created: delete the empty ones along with their
        // messages, hand the rest to the first remaining admin or member.
        for mut room in self.deps.room_repository.list_by_creator(user_id).await? {
            if room.members.len() <= 1 {
                self.deps
                    .message_repository
                    .delete_by_room(room.name.as_str())
                    .await?;
                self.deps.room_repository.delete(room.id).await?;
            } else {
                let new_owner = room
                    .admins
                    .iter()
                    .find(|id| **id != user_id)
                    .or_else(|| room.members.first())
                    .copied();
                room.created_by = new_owner;
                self.deps.room_repository.update(room).await?;
            }
        }

        for session in self.deps.registry.find_by_user(user_id).await {
            self.deps
                .sinks
                .send_to(
                    session.connection_id,
                    ServerEvent::AccountDeleted {
                        message: "Your account has been deleted by an administrator"
                            .to_string(),
                    },
                )
                .await;
            // Dropping the sink closes the socket once the notice drains.
            self.deps.sinks.unregister(session.connection_id).await;
        }

        self.deps.user_repository.delete(user_id).await?;
        info!(%user_id, "user deleted by admin");
        Ok(())
    }

    pub async fn update_user(
        &self,
        user_id: UserId,
        request: UpdateUserRequest,
    ) -> ApplicationResult<User> {
        let mut user = self
            .deps
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("User not found"))?;

        if let Some(role) = request.role {
            user.role = role;
        }
        if let Some(permissions) = request.permissions {
            user.permissions = permissions;
        }
        Ok(self.deps.user_repository.update(user).await?)
    }

    pub async fn list_messages(&self, filter: MessageFilter) -> ApplicationResult<MessagePage> {
        Ok(self.deps.message_repository.search(filter).await?)
    }

    /// Removes one message and tells its room.
    pub async fn delete_message(&self, message_id: MessageId) -> ApplicationResult<()> {
        let message = self
            .deps
            .message_repository
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Message not found"))?;

        self.deps.message_repository.delete(message_id).await?;

        if let Some(room) = &message.room {
            self.deps
                .presence
                .send_to_room(room, ServerEvent::MessageDeleted { message_id })
                .await;
        }
        info!(%message_id, "message deleted by admin");
        Ok(())
    }

    /// Bulk removal; every affected room gets one notice with its count.
    pub async fn bulk_delete_messages(
        &self,
        filter: BulkDeleteFilter,
    ) -> ApplicationResult<u64> {
        let deleted = self.deps.message_repository.bulk_delete(filter).await?;

        let mut per_room: BTreeMap<String, u64> = BTreeMap::new();
        for message in &deleted {
            if let Some(room) = &message.room {
                *per_room.entry(room.clone()).or_default() += 1;
            }
        }
        for (room, count) in per_room {
            self.deps
                .presence
                .send_to_room(
                    &room,
                    ServerEvent::MessagesBulkDeleted {
                        room: room.clone(),
                        count,
                    },
                )
                .await;
        }
        Ok(deleted.len() as u64)
    }
}
