use serde::{Deserialize, Serialize};

use crate::value_objects::{Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

/// Fine-grained moderation permissions. Admins get all of them; individual
/// flags can also be granted to regular users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Permissions {
    pub can_delete_messages: bool,
    pub can_delete_users: bool,
    pub can_manage_rooms: bool,
    pub can_view_all_users: bool,
}

impl Permissions {
    pub fn all() -> Self {
        Self {
            can_delete_messages: true,
            can_delete_users: true,
            can_manage_rooms: true,
            can_view_all_users: true,
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: UserRole,
    pub permissions: Permissions,
    pub avatar: Option<String>,
    pub is_online: bool,
    pub last_seen: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admins pass every check; others need the individual flag.
    pub fn has_permission(&self, check: impl Fn(&Permissions) -> bool) -> bool {
        self.is_admin() || check(&self.permissions)
    }
}
