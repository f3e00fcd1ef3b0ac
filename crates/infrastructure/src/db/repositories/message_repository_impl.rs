use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{query, query_as, query_scalar, FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use application::{
    BulkDeleteFilter, MessageFilter, MessagePage, MessageRepository, RepositoryError,
};
use domain::{Attachment, Message, MessageId, MessageKind, Reaction, Sender, UserId};

use super::map_sqlx_error;
use crate::db::DbPool;

/// Database row shape for a message. Registered senders fill the user
/// columns, guests fill `guest_name`; reactions live in a JSONB column.
#[derive(Debug, Clone, FromRow)]
struct DbMessage {
    pub id: Uuid,
    pub sender_user_id: Option<Uuid>,
    pub sender_username: Option<String>,
    pub guest_name: Option<String>,
    pub content: String,
    pub room: Option<String>,
    pub recipient: Option<Uuid>,
    pub kind: String,
    pub attachment_url: Option<String>,
    pub attachment_file_name: Option<String>,
    pub reactions: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl From<DbMessage> for Message {
    fn from(row: DbMessage) -> Self {
        let sender = match (row.sender_user_id, row.sender_username) {
            (Some(user_id), Some(username)) => Sender::Registered {
                user_id: UserId::new(user_id),
                username,
            },
            _ => Sender::Guest {
                display_name: row.guest_name.unwrap_or_else(|| "guest".to_string()),
            },
        };
        let kind = match row.kind.as_str() {
            "image" => MessageKind::Image,
            "file" => MessageKind::File,
            _ => MessageKind::Text,
        };
        let attachment = match (row.attachment_url, row.attachment_file_name) {
            (Some(url), Some(file_name)) => Some(Attachment { url, file_name }),
            _ => None,
        };
        let reactions: Vec<Reaction> = serde_json::from_value(row.reactions).unwrap_or_default();
        Message {
            id: MessageId::new(row.id),
            sender,
            content: row.content,
            room: row.room,
            recipient: row.recipient.map(UserId::new),
            kind,
            attachment,
            reactions,
            created_at: row.created_at,
        }
    }
}

fn kind_str(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Text => "text",
        MessageKind::Image => "image",
        MessageKind::File => "file",
    }
}

fn reactions_json(reactions: &[Reaction]) -> Result<JsonValue, RepositoryError> {
    serde_json::to_value(reactions).map_err(|e| RepositoryError::database(e.to_string()))
}

pub struct PgMessageRepository {
    pool: DbPool,
}

impl PgMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn push_search_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a MessageFilter) {
    if let Some(room) = &filter.room {
        builder.push(" AND room = ").push_bind(room);
    }
    if let Some(search) = &filter.search {
        builder
            .push(" AND content ILIKE ")
            .push_bind(format!("%{search}%"));
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: Message) -> Result<Message, RepositoryError> {
        let (sender_user_id, sender_username, guest_name) = match &message.sender {
            Sender::Registered { user_id, username } => {
                (Some(Uuid::from(*user_id)), Some(username.clone()), None)
            }
            Sender::Guest { display_name } => (None, None, Some(display_name.clone())),
        };
        let row = query_as::<_, DbMessage>(
            r#"INSERT INTO messages (
                   id, sender_user_id, sender_username, guest_name, content,
                   room, recipient, kind, attachment_url, attachment_file_name,
                   reactions, created_at
               ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
               RETURNING *"#,
        )
        .bind(Uuid::from(message.id))
        .bind(sender_user_id)
        .bind(sender_username)
        .bind(guest_name)
        .bind(&message.content)
        .bind(&message.room)
        .bind(message.recipient.map(Uuid::from))
        .bind(kind_str(message.kind))
        .bind(message.attachment.as_ref().map(|a| a.url.clone()))
        .bind(message.attachment.as_ref().map(|a| a.file_name.clone()))
        .bind(reactions_json(&message.reactions)?)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update(&self, message: Message) -> Result<Message, RepositoryError> {
        let row = query_as::<_, DbMessage>(
            r#"UPDATE messages SET
                   content = $2, kind = $3, attachment_url = $4,
                   attachment_file_name = $5, reactions = $6
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(Uuid::from(message.id))
        .bind(&message.content)
        .bind(kind_str(message.kind))
        .bind(message.attachment.as_ref().map(|a| a.url.clone()))
        .bind(message.attachment.as_ref().map(|a| a.file_name.clone()))
        .bind(reactions_json(&message.reactions)?)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let row = query_as::<_, DbMessage>("SELECT * FROM messages WHERE id = $1")
            .bind(Uuid::from(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn list_recent_public(
        &self,
        room: &str,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = query_as::<_, DbMessage>(
            r#"SELECT * FROM messages
               WHERE room = $1 AND recipient IS NULL
               ORDER BY created_at DESC
               LIMIT $2"#,
        )
        .bind(room)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_public_page(
        &self,
        room: &str,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);
        let rows = query_as::<_, DbMessage>(
            r#"SELECT * FROM messages
               WHERE room = $1 AND recipient IS NULL
               ORDER BY created_at DESC
               LIMIT $2 OFFSET $3"#,
        )
        .bind(room)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_private_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = query_as::<_, DbMessage>(
            r#"SELECT * FROM messages
               WHERE recipient IS NOT NULL
                 AND ((sender_user_id = $1 AND recipient = $2)
                   OR (sender_user_id = $2 AND recipient = $1))
               ORDER BY created_at ASC"#,
        )
        .bind(Uuid::from(a))
        .bind(Uuid::from(b))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn search(&self, filter: MessageFilter) -> Result<MessagePage, RepositoryError> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM messages WHERE 1=1");
        push_search_filters(&mut count_builder, &filter);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let limit = if filter.limit == 0 { 50 } else { filter.limit };
        let offset = i64::from(filter.page.saturating_sub(1)) * i64::from(limit);
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM messages WHERE 1=1");
        push_search_filters(&mut builder, &filter);
        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(i64::from(limit))
            .push(" OFFSET ")
            .push_bind(offset);
        let rows = builder
            .build_query_as::<DbMessage>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(MessagePage {
            messages: rows.into_iter().map(Into::into).collect(),
            total: total as u64,
        })
    }

    async fn delete(&self, id: MessageId) -> Result<(), RepositoryError> {
        query("DELETE FROM messages WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn bulk_delete(
        &self,
        filter: BulkDeleteFilter,
    ) -> Result<Vec<Message>, RepositoryError> {
        if !filter.ids.is_empty() {
            let ids: Vec<Uuid> = filter.ids.into_iter().map(Uuid::from).collect();
            let rows = query_as::<_, DbMessage>(
                "DELETE FROM messages WHERE id = ANY($1) RETURNING *",
            )
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
            return Ok(rows.into_iter().map(Into::into).collect());
        }

        // An empty filter would wipe the table; treat it as a no-op.
        if filter.room.is_none() && filter.range.is_none() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("DELETE FROM messages WHERE 1=1");
        if let Some(room) = &filter.room {
            builder.push(" AND room = ").push_bind(room.clone());
        }
        if let Some((from, to)) = filter.range {
            builder.push(" AND created_at >= ").push_bind(from);
            builder.push(" AND created_at <= ").push_bind(to);
        }
        builder.push(" RETURNING *");
        let rows = builder
            .build_query_as::<DbMessage>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_by_sender(&self, sender: UserId) -> Result<u64, RepositoryError> {
        let result = query("DELETE FROM messages WHERE sender_user_id = $1")
            .bind(Uuid::from(sender))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn delete_by_room(&self, room: &str) -> Result<u64, RepositoryError> {
        let result = query("DELETE FROM messages WHERE room = $1")
            .bind(room)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn count_by_sender(&self, sender: UserId) -> Result<u64, RepositoryError> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM messages WHERE sender_user_id = $1")
            .bind(Uuid::from(sender))
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(count as u64)
    }

    async fn count_public_in_room(&self, room: &str) -> Result<u64, RepositoryError> {
        let count: i64 = query_scalar(
            "SELECT COUNT(*) FROM messages WHERE room = $1 AND recipient IS NULL",
        )
        .bind(room)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(count as u64)
    }
}
