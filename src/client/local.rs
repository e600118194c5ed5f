use uuid::Uuid;

use crate::{
    chat::Chat,
    feed::{Filter, Subscription},
    model::{Message, NewMessage, Room},
};

use super::{ChatBackend, ClientError};

/// Talks to the chat services in the same process, no HTTP in between.
#[derive(Clone)]
pub struct LocalBackend {
    chat: Chat,
}

impl LocalBackend {
    pub fn new(chat: Chat) -> LocalBackend {
        LocalBackend { chat }
    }
}

impl ChatBackend for LocalBackend {
    type Subscription = Subscription;

    async fn list_rooms(&self) -> Result<Vec<Room>, ClientError> {
        Ok(self.chat.store().list_rooms().await?)
    }

    async fn verify_room_password(&self, room_id: Uuid, password: &str) -> Result<bool, ClientError> {
        Ok(self.chat.store().verify_room_password(room_id, password).await?)
    }

    async fn list_messages(&self, room_id: Uuid) -> Result<Vec<Message>, ClientError> {
        Ok(self.chat.store().list_messages(room_id).await?)
    }

    async fn insert_message(&self, room_id: Uuid, draft: NewMessage) -> Result<Message, ClientError> {
        Ok(self.chat.post_message(room_id, draft).await?)
    }

    async fn subscribe(&self, room_id: Uuid) -> Result<Subscription, ClientError> {
        Ok(self.chat.subscribe(Filter::room_messages(room_id)))
    }
}
