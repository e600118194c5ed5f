use uuid::Uuid;

use crate::{
    feed::{ChangeEvent, ChangeFeed, Filter, Subscription},
    model::{MAX_MESSAGE_CHARS, MAX_USERNAME_CHARS, Message, NewMessage, Room},
    store::{Store, StoreError, StoreResult},
};

/// Store writes paired with the change events they produce.
#[derive(Clone)]
pub struct Chat {
    store: Store,
    feed: ChangeFeed,
}

impl Chat {
    pub fn new(store: Store, feed: ChangeFeed) -> Chat {
        Chat { store, feed }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    pub fn subscribe(&self, filter: Filter) -> Subscription {
        self.feed.subscribe(filter)
    }

    pub async fn post_message(&self, room_id: Uuid, draft: NewMessage) -> StoreResult<Message> {
        let NewMessage { username, message } = validate(draft)?;

        if self.store.room(room_id).await?.is_none() {
            return Err(StoreError::NotFound("room"));
        }

        let message = self.store.insert_message(room_id, &username, &message).await?;
        tracing::info!(room_id = %room_id, id = %message.id, username = %message.username, "message posted");

        self.feed.publish(ChangeEvent::MessageInserted { record: message.clone() });
        Ok(message)
    }

    pub async fn delete_message(&self, id: Uuid) -> StoreResult<Message> {
        let message = self
            .store
            .delete_message(id)
            .await?
            .ok_or(StoreError::NotFound("message"))?;
        tracing::info!(room_id = %message.room_id, id = %id, "message deleted");

        self.feed.publish(ChangeEvent::MessageDeleted {
            id,
            room_id: message.room_id,
        });
        Ok(message)
    }

    pub async fn create_room(&self, name: &str, password: &str) -> StoreResult<Room> {
        let room = self.store.create_room(name, password).await?;
        tracing::info!(room_id = %room.id, name = %room.name, "room created");

        self.feed.publish(ChangeEvent::RoomCreated { record: room.clone() });
        Ok(room)
    }

    pub async fn delete_room(&self, room_id: Uuid) -> StoreResult<()> {
        let removed = self.store.delete_room(room_id).await?;
        tracing::info!(room_id = %room_id, messages = removed.len(), "room deleted");

        for id in removed {
            self.feed.publish(ChangeEvent::MessageDeleted { id, room_id });
        }
        self.feed.publish(ChangeEvent::RoomDeleted { id: room_id });
        Ok(())
    }
}

fn validate(NewMessage { username, message }: NewMessage) -> StoreResult<NewMessage> {
    let username = username.trim();
    let message = message.trim();

    if username.is_empty() {
        return Err(StoreError::Invalid("display name must not be empty".to_owned()));
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(StoreError::Invalid(format!(
            "display name must be at most {MAX_USERNAME_CHARS} characters"
        )));
    }
    if message.is_empty() {
        return Err(StoreError::Invalid("message must not be empty".to_owned()));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(StoreError::Invalid(format!(
            "message must be at most {MAX_MESSAGE_CHARS} characters"
        )));
    }

    Ok(NewMessage {
        username: username.to_owned(),
        message: message.to_owned(),
    })
}

#[cfg(test)]
pub(crate) async fn test_chat() -> Chat {
    Chat::new(crate::store::test_store().await, ChangeFeed::new(64))
}
