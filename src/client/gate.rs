use uuid::Uuid;

use super::{ChatBackend, ClientError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    NoRoom,
    Locked(Uuid),
    Unlocked(Uuid),
}

/// Locked until the backend says yes to a password for the selected room.
#[derive(Debug)]
pub struct RoomGate {
    state: GateState,
}

impl Default for RoomGate {
    fn default() -> Self {
        RoomGate {
            state: GateState::NoRoom,
        }
    }
}

impl RoomGate {
    pub fn new() -> RoomGate {
        RoomGate::default()
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn selected(&self) -> Option<Uuid> {
        match self.state {
            GateState::NoRoom => None,
            GateState::Locked(room_id) | GateState::Unlocked(room_id) => Some(room_id),
        }
    }

    pub fn unlocked_room(&self) -> Option<Uuid> {
        match self.state {
            GateState::Unlocked(room_id) => Some(room_id),
            _ => None,
        }
    }

    /// Picking a different room locks the gate again.
    pub fn select(&mut self, room_id: Uuid) {
        if self.selected() != Some(room_id) {
            self.state = GateState::Locked(room_id);
        }
    }

    /// One verification round trip. `Ok(false)` leaves the gate locked.
    pub async fn unlock<B: ChatBackend>(&mut self, backend: &B, password: &str) -> Result<bool, ClientError> {
        let room_id = self.selected().ok_or(ClientError::NoRoom)?;
        if password.is_empty() {
            return Err(ClientError::MissingPassword);
        }

        let unlocked = backend.verify_room_password(room_id, password).await?;
        // The selection cannot change while `&mut self` is held.
        if unlocked {
            self.state = GateState::Unlocked(room_id);
        }
        Ok(unlocked)
    }
}

#[cfg(test)]
mod tests {
    use crate::{chat::test_chat, client::LocalBackend};

    use super::*;

    #[tokio::test]
    async fn stays_locked_until_the_exact_pair_verifies() {
        let chat = test_chat().await;
        let general = chat.create_room("general", "secret123").await.unwrap();
        let random = chat.create_room("random", "letmein").await.unwrap();
        let backend = LocalBackend::new(chat);
        let mut gate = RoomGate::new();

        assert!(matches!(gate.unlock(&backend, "secret123").await, Err(ClientError::NoRoom)));

        gate.select(general.id);
        assert!(matches!(gate.unlock(&backend, "").await, Err(ClientError::MissingPassword)));
        assert!(!gate.unlock(&backend, "letmein").await.unwrap());
        assert_eq!(gate.state(), GateState::Locked(general.id));
        assert!(!gate.unlock(&backend, "Secret123").await.unwrap());
        assert_eq!(gate.unlocked_room(), None);

        assert!(gate.unlock(&backend, "secret123").await.unwrap());
        assert_eq!(gate.state(), GateState::Unlocked(general.id));

        gate.select(general.id);
        assert_eq!(gate.unlocked_room(), Some(general.id));

        gate.select(random.id);
        assert_eq!(gate.state(), GateState::Locked(random.id));
    }
}
