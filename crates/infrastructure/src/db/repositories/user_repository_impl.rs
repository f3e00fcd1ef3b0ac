use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, FromRow};
use uuid::Uuid;

use application::{RepositoryError, UserRepository};
use domain::{Permissions, Timestamp, User, UserId, UserRole};

use super::map_sqlx_error;
use crate::db::DbPool;

/// Database row shape for a user.
#[derive(Debug, Clone, FromRow)]
struct DbUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub can_delete_messages: bool,
    pub can_delete_users: bool,
    pub can_manage_rooms: bool,
    pub can_view_all_users: bool,
    pub avatar: Option<String>,
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<DbUser> for User {
    fn from(row: DbUser) -> Self {
        let role = match row.role.as_str() {
            "admin" => UserRole::Admin,
            _ => UserRole::User,
        };
        User {
            id: UserId::new(row.id),
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role,
            permissions: Permissions {
                can_delete_messages: row.can_delete_messages,
                can_delete_users: row.can_delete_users,
                can_manage_rooms: row.can_manage_rooms,
                can_view_all_users: row.can_view_all_users,
            },
            avatar: row.avatar,
            is_online: row.is_online,
            last_seen: row.last_seen,
            created_at: row.created_at,
        }
    }
}

fn role_str(role: UserRole) -> &'static str {
    match role {
        UserRole::Admin => "admin",
        UserRole::User => "user",
    }
}

pub struct PgUserRepository {
    pool: DbPool,
}

impl PgUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: User) -> Result<User, RepositoryError> {
        let row = query_as::<_, DbUser>(
            r#"INSERT INTO users (
                   id, username, email, password_hash, role,
                   can_delete_messages, can_delete_users, can_manage_rooms,
                   can_view_all_users, avatar, is_online, last_seen, created_at
               ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
               RETURNING *"#,
        )
        .bind(Uuid::from(user.id))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(role_str(user.role))
        .bind(user.permissions.can_delete_messages)
        .bind(user.permissions.can_delete_users)
        .bind(user.permissions.can_manage_rooms)
        .bind(user.permissions.can_view_all_users)
        .bind(&user.avatar)
        .bind(user.is_online)
        .bind(user.last_seen)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update(&self, user: User) -> Result<User, RepositoryError> {
        let row = query_as::<_, DbUser>(
            r#"UPDATE users SET
                   username = $2, email = $3, password_hash = $4, role = $5,
                   can_delete_messages = $6, can_delete_users = $7,
                   can_manage_rooms = $8, can_view_all_users = $9,
                   avatar = $10, is_online = $11, last_seen = $12
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(Uuid::from(user.id))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(role_str(user.role))
        .bind(user.permissions.can_delete_messages)
        .bind(user.permissions.can_delete_users)
        .bind(user.permissions.can_manage_rooms)
        .bind(user.permissions.can_view_all_users)
        .bind(&user.avatar)
        .bind(user.is_online)
        .bind(user.last_seen)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = query_as::<_, DbUser>("SELECT * FROM users WHERE id = $1")
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let row = query_as::<_, DbUser>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let row = query_as::<_, DbUser>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = query_as::<_, DbUser>("SELECT * FROM users ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        query("DELETE FROM users WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn set_online(
        &self,
        id: UserId,
        is_online: bool,
        last_seen: Timestamp,
    ) -> Result<(), RepositoryError> {
        query("UPDATE users SET is_online = $2, last_seen = $3 WHERE id = $1")
            .bind(Uuid::from(id))
            .bind(is_online)
            .bind(last_seen)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
