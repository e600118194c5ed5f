use uuid::Uuid;

use crate::model::{Room, now_nanos, timestamp_from_nanos};

use super::{Store, StoreError, StoreResult, parse_id};

type RoomRow = (String, String, i64);

fn room_from_row((id, name, created_at): RoomRow) -> StoreResult<Room> {
    Ok(Room {
        id: parse_id(&id)?,
        name,
        created_at: timestamp_from_nanos(created_at),
    })
}

impl Store {
    pub async fn list_rooms(&self) -> StoreResult<Vec<Room>> {
        sqlx::query_as::<_, RoomRow>("SELECT id,name,created_at FROM rooms ORDER BY created_at ASC, id ASC")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(room_from_row)
            .collect()
    }

    pub async fn room(&self, room_id: Uuid) -> StoreResult<Option<Room>> {
        sqlx::query_as::<_, RoomRow>("SELECT id,name,created_at FROM rooms WHERE id=?")
            .bind(room_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(room_from_row)
            .transpose()
    }

    pub async fn create_room(&self, name: &str, password: &str) -> StoreResult<Room> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Invalid("room name must not be empty".to_owned()));
        }
        if password.is_empty() {
            return Err(StoreError::Invalid("room password must not be empty".to_owned()));
        }

        let password_hash = self.hash_password(password.to_owned()).await?;
        let room = Room {
            id: Uuid::now_v7(),
            name: name.to_owned(),
            created_at: timestamp_from_nanos(now_nanos()),
        };

        sqlx::query("INSERT INTO rooms (id,name,password_hash,created_at) VALUES (?,?,?,?)")
            .bind(room.id.to_string())
            .bind(&room.name)
            .bind(password_hash)
            .bind(room.created_at.unix_timestamp_nanos() as i64)
            .execute(&self.pool)
            .await?;

        Ok(room)
    }

    /// Deletes the room and, through the foreign key, its messages.
    /// Returns the ids of the messages that went with it.
    pub async fn delete_room(&self, room_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let mut tx = self.pool.begin().await?;

        let message_ids: Vec<(String,)> =
            sqlx::query_as("SELECT id FROM messages WHERE room_id=? ORDER BY created_at ASC, id ASC")
                .bind(room_id.to_string())
                .fetch_all(&mut *tx)
                .await?;

        let deleted = sqlx::query("DELETE FROM rooms WHERE id=?")
            .bind(room_id.to_string())
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::NotFound("room"));
        }

        tx.commit().await?;

        message_ids.iter().map(|(id,)| parse_id(id)).collect()
    }

    /// Checks a password attempt for a room. Unknown rooms never verify.
    pub async fn verify_room_password(&self, room_id: Uuid, password: &str) -> StoreResult<bool> {
        let Some((password_hash,)): Option<(String,)> =
            sqlx::query_as("SELECT password_hash FROM rooms WHERE id=?")
                .bind(room_id.to_string())
                .fetch_optional(&self.pool)
                .await?
        else {
            return Ok(false);
        };

        self.check_password(password_hash, password.to_owned()).await
    }
}
