use uuid::Uuid;

use crate::model::{Message, now_nanos, timestamp_from_nanos};

use super::{Store, StoreError, StoreResult, parse_id};

type MessageRow = (String, String, String, String, i64);

fn message_from_row((id, room_id, username, message, created_at): MessageRow) -> StoreResult<Message> {
    Ok(Message {
        id: parse_id(&id)?,
        room_id: parse_id(&room_id)?,
        username,
        message,
        created_at: timestamp_from_nanos(created_at),
    })
}

impl Store {
    /// History of one room, oldest first.
    pub async fn list_messages(&self, room_id: Uuid) -> StoreResult<Vec<Message>> {
        sqlx::query_as::<_, MessageRow>(
            "SELECT id,room_id,username,message,created_at FROM messages WHERE room_id=? ORDER BY created_at ASC, id ASC",
        )
        .bind(room_id.to_string())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(message_from_row)
        .collect()
    }

    /// Every message across rooms, newest first.
    pub async fn list_all_messages(&self) -> StoreResult<Vec<Message>> {
        sqlx::query_as::<_, MessageRow>(
            "SELECT id,room_id,username,message,created_at FROM messages ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(message_from_row)
        .collect()
    }

    pub async fn insert_message(&self, room_id: Uuid, username: &str, body: &str) -> StoreResult<Message> {
        let message = Message {
            id: Uuid::now_v7(),
            room_id,
            username: username.to_owned(),
            message: body.to_owned(),
            created_at: timestamp_from_nanos(now_nanos()),
        };

        let result = sqlx::query("INSERT INTO messages (id,room_id,username,message,created_at) VALUES (?,?,?,?,?)")
            .bind(message.id.to_string())
            .bind(room_id.to_string())
            .bind(&message.username)
            .bind(&message.message)
            .bind(message.created_at.unix_timestamp_nanos() as i64)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(message),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => Err(StoreError::NotFound("room")),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes one message and hands back the row that was removed.
    pub async fn delete_message(&self, id: Uuid) -> StoreResult<Option<Message>> {
        sqlx::query_as::<_, MessageRow>(
            "DELETE FROM messages WHERE id=? RETURNING id,room_id,username,message,created_at",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .map(message_from_row)
        .transpose()
    }
}
