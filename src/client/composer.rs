use crate::model::{Message, NewMessage};

use super::{ChatBackend, ClientError, Identity, RoomGate};

#[derive(Debug, Default)]
pub struct Composer {
    draft: String,
}

impl Composer {
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Sends the draft to the unlocked room. Rejections leave the draft as
    /// it was and issue no write; once a write is issued the draft is
    /// cleared whether or not it succeeds.
    pub async fn submit<B: ChatBackend>(
        &mut self,
        backend: &B,
        gate: &RoomGate,
        identity: &Identity,
    ) -> Result<Message, ClientError> {
        let body = self.draft.trim();
        if body.is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        let username = identity.name().ok_or(ClientError::NoIdentity)?;
        let room_id = gate.unlocked_room().ok_or(ClientError::Locked)?;

        let draft = NewMessage {
            username: username.to_owned(),
            message: body.to_owned(),
        };
        self.draft.clear();

        backend.insert_message(room_id, draft).await
    }
}
