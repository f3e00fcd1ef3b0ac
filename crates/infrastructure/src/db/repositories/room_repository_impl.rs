use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, FromRow};
use uuid::Uuid;

use application::{RepositoryError, RoomRepository};
use domain::{Room, RoomId, RoomName, UserId};

use super::map_sqlx_error;
use crate::db::DbPool;

#[derive(Debug, Clone, FromRow)]
struct DbRoom {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub is_private: bool,
    pub created_by: Option<Uuid>,
    pub members: Vec<Uuid>,
    pub admins: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbRoom> for Room {
    type Error = RepositoryError;

    fn try_from(row: DbRoom) -> Result<Self, Self::Error> {
        // Names are validated before insert, so a parse failure here means
        // the table was written outside the application.
        let name = RoomName::parse(&row.name)
            .map_err(|e| RepositoryError::database(format!("invalid stored room name: {e}")))?;
        Ok(Room {
            id: RoomId::new(row.id),
            name,
            description: row.description,
            is_private: row.is_private,
            created_by: row.created_by.map(UserId::new),
            members: row.members.into_iter().map(UserId::new).collect(),
            admins: row.admins.into_iter().map(UserId::new).collect(),
            created_at: row.created_at,
        })
    }
}

fn uuid_vec(ids: &[UserId]) -> Vec<Uuid> {
    ids.iter().copied().map(Uuid::from).collect()
}

pub struct PgRoomRepository {
    pool: DbPool,
}

impl PgRoomRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PgRoomRepository {
    async fn create(&self, room: Room) -> Result<Room, RepositoryError> {
        let row = query_as::<_, DbRoom>(
            r#"INSERT INTO rooms (
                   id, name, description, is_private, created_by,
                   members, admins, created_at
               ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
               RETURNING *"#,
        )
        .bind(Uuid::from(room.id))
        .bind(room.name.as_str())
        .bind(&room.description)
        .bind(room.is_private)
        .bind(room.created_by.map(Uuid::from))
        .bind(uuid_vec(&room.members))
        .bind(uuid_vec(&room.admins))
        .bind(room.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.try_into()
    }

    async fn update(&self, room: Room) -> Result<Room, RepositoryError> {
        let row = query_as::<_, DbRoom>(
            r#"UPDATE rooms SET
                   description = $2, is_private = $3, created_by = $4,
                   members = $5, admins = $6
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(Uuid::from(room.id))
        .bind(&room.description)
        .bind(room.is_private)
        .bind(room.created_by.map(Uuid::from))
        .bind(uuid_vec(&room.members))
        .bind(uuid_vec(&room.admins))
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.try_into()
    }

    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError> {
        let row = query_as::<_, DbRoom>("SELECT * FROM rooms WHERE id = $1")
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Room>, RepositoryError> {
        let row = query_as::<_, DbRoom>("SELECT * FROM rooms WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_public(&self) -> Result<Vec<Room>, RepositoryError> {
        let rows = query_as::<_, DbRoom>(
            "SELECT * FROM rooms WHERE is_private = FALSE ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn list_by_creator(&self, creator: UserId) -> Result<Vec<Room>, RepositoryError> {
        let rows = query_as::<_, DbRoom>(
            "SELECT * FROM rooms WHERE created_by = $1 ORDER BY created_at ASC",
        )
        .bind(Uuid::from(creator))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn delete(&self, id: RoomId) -> Result<(), RepositoryError> {
        query("DELETE FROM rooms WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn remove_user_everywhere(&self, user: UserId) -> Result<(), RepositoryError> {
        query(
            r#"UPDATE rooms
               SET members = array_remove(members, $1),
                   admins = array_remove(admins, $1)
               WHERE $1 = ANY(members) OR $1 = ANY(admins)"#,
        )
        .bind(Uuid::from(user))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}
