use serde::{Deserialize, Serialize};

use crate::value_objects::{RoomId, RoomName, Timestamp, UserId};

/// A persisted room record.
///
/// Room membership for broadcast purposes is derived from live sessions, not
/// from this record; `members`/`admins` track the durable side only. Rooms
/// created by guests have no creator and empty member lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: RoomName,
    pub description: String,
    pub is_private: bool,
    pub created_by: Option<UserId>,
    pub members: Vec<UserId>,
    pub admins: Vec<UserId>,
    pub created_at: Timestamp,
}

impl Room {
    pub fn new(
        id: RoomId,
        name: RoomName,
        description: Option<String>,
        is_private: bool,
        created_by: Option<UserId>,
        created_at: Timestamp,
    ) -> Self {
        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("{} discussion room", name));
        let members: Vec<UserId> = created_by.into_iter().collect();
        Self {
            id,
            name,
            description,
            is_private,
            created_by,
            admins: members.clone(),
            members,
            created_at,
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}
