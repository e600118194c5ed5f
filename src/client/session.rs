use uuid::Uuid;

use crate::model::{Message, Room};

use super::{
    Applied, ChatBackend, ClientError, Composer, FeedState, Identity, MessageFeed, Notice, RoomGate,
};

/// Everything one participant's chat screen holds, passed around
/// explicitly instead of living in globals.
pub struct ChatSession<B: ChatBackend> {
    backend: B,
    rooms: Vec<Room>,
    gate: RoomGate,
    identity: Identity,
    feed: MessageFeed<B::Subscription>,
    composer: Composer,
    notices: Vec<Notice>,
}

impl<B: ChatBackend> ChatSession<B> {
    pub fn new(backend: B) -> ChatSession<B> {
        ChatSession {
            backend,
            rooms: Vec::new(),
            gate: RoomGate::new(),
            identity: Identity::default(),
            feed: MessageFeed::new(),
            composer: Composer::default(),
            notices: Vec::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn gate(&self) -> &RoomGate {
        &self.gate
    }

    pub fn current_room(&self) -> Option<&Room> {
        let selected = self.gate.selected()?;
        self.rooms.iter().find(|room| room.id == selected)
    }

    pub fn messages(&self) -> &[Message] {
        self.feed.messages()
    }

    pub fn feed_state(&self) -> FeedState {
        self.feed.state()
    }

    pub fn display_name(&self) -> Option<&str> {
        self.identity.name()
    }

    pub fn draft(&self) -> &str {
        self.composer.draft()
    }

    /// Whether `message` carries this session's display name. Names are
    /// labels, so another participant using the same one counts too.
    pub fn is_own(&self, message: &Message) -> bool {
        self.identity.name() == Some(message.username.as_str())
    }

    /// Drains pending notifications, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Fetches the room list; the first room is preselected when nothing is.
    pub async fn load_rooms(&mut self) -> &[Room] {
        match self.backend.list_rooms().await {
            Ok(rooms) => {
                self.rooms = rooms;
                if self.gate.selected().is_none() {
                    if let Some(first) = self.rooms.first() {
                        self.gate.select(first.id);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "loading rooms failed");
                self.notices.push(Notice::error(e.to_string()));
            }
        }
        &self.rooms
    }

    pub fn select_room(&mut self, room_id: Uuid) {
        if self.gate.selected() == Some(room_id) {
            return;
        }
        self.feed.close();
        self.gate.select(room_id);
    }

    /// Room Gate submit. On success the feed for the room goes live.
    pub async fn unlock(&mut self, password: &str) -> bool {
        match self.gate.unlock(&self.backend, password).await {
            Ok(true) => {
                self.notices.push(Notice::info("Success", "Room unlocked successfully!"));
            }
            Ok(false) => {
                self.notices.push(Notice::error("Incorrect password. Please try again."));
                return false;
            }
            Err(ClientError::NoRoom | ClientError::MissingPassword) => {
                self.notices.push(Notice::error("Please select a room and enter password."));
                return false;
            }
            Err(e) => {
                self.notices.push(Notice::error(e.to_string()));
                return false;
            }
        }

        let Some(room_id) = self.gate.unlocked_room() else {
            return false;
        };
        if let Err(e) = self.feed.open(&self.backend, room_id).await {
            tracing::warn!(room_id = %room_id, error = %e, "opening feed failed");
            self.notices.push(Notice::error(e.to_string()));
        }
        true
    }

    pub fn set_display_name(&mut self, raw: &str) -> bool {
        match self.identity.set(raw) {
            Ok(name) => {
                let description = format!("You're now chatting as {name}");
                self.notices.push(Notice::info("Welcome!", description));
                true
            }
            Err(_) => false,
        }
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.composer.set_draft(text);
    }

    /// Composer submit. Blank drafts, a missing name or a locked room are
    /// dropped silently without a write.
    pub async fn send(&mut self) -> Option<Message> {
        match self.composer.submit(&self.backend, &self.gate, &self.identity).await {
            Ok(message) => Some(message),
            Err(ClientError::EmptyMessage | ClientError::NoIdentity | ClientError::Locked) => None,
            Err(e) => {
                tracing::warn!(error = %e, "sending message failed");
                self.notices.push(Notice::error("Failed to send message. Please try again."));
                None
            }
        }
    }

    pub async fn send_text(&mut self, text: &str) -> Option<Message> {
        self.set_draft(text);
        self.send().await
    }

    /// Applies the next live event to the message list.
    pub async fn pump(&mut self) -> Option<Applied> {
        self.feed.pump().await
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        chat::test_chat,
        client::{GateState, LocalBackend, NoticeLevel},
        model::NewMessage,
    };

    use super::*;

    #[tokio::test]
    async fn general_room_scenario() {
        let chat = test_chat().await;
        let general = chat.create_room("general", "secret123").await.unwrap();
        chat.create_room("random", "other").await.unwrap();

        let mut ana = ChatSession::new(LocalBackend::new(chat.clone()));
        let mut bo = ChatSession::new(LocalBackend::new(chat.clone()));
        for session in [&mut ana, &mut bo] {
            assert_eq!(session.load_rooms().await.len(), 2);
            assert_eq!(session.current_room().map(|r| r.name.as_str()), Some("general"));
            assert!(session.unlock("secret123").await);
            assert_eq!(session.feed_state(), FeedState::Live);
        }
        assert!(ana.set_display_name("Ana"));
        let notices = ana.take_notices();
        assert_eq!(notices.last().unwrap().description, "You're now chatting as Ana");

        let sent = ana.send_text("Hello").await.unwrap();
        assert_eq!(
            (sent.username.as_str(), sent.message.as_str(), sent.room_id),
            ("Ana", "Hello", general.id)
        );

        for session in [&mut ana, &mut bo] {
            assert_eq!(session.pump().await, Some(Applied::Appended));
            assert_eq!(session.messages(), std::slice::from_ref(&sent));
        }
        assert!(ana.is_own(&sent));
        assert!(!bo.is_own(&sent));
        assert_eq!(chat.store().list_messages(general.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn wrong_password_keeps_the_room_locked() {
        let chat = test_chat().await;
        let general = chat.create_room("general", "secret123").await.unwrap();
        let mut session = ChatSession::new(LocalBackend::new(chat));
        session.load_rooms().await;

        assert!(!session.unlock("nope").await);
        assert_eq!(session.gate().state(), GateState::Locked(general.id));
        assert_eq!(session.feed_state(), FeedState::Unsubscribed);
        let notice = session.take_notices().pop().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.description, "Incorrect password. Please try again.");

        assert!(!session.unlock("").await);
        assert_eq!(
            session.take_notices().pop().unwrap().description,
            "Please select a room and enter password."
        );

        session.set_display_name("Ana");
        assert_eq!(session.send_text("let me in").await, None);
    }

    #[tokio::test]
    async fn whitespace_is_never_sent() {
        let chat = test_chat().await;
        let general = chat.create_room("general", "pw").await.unwrap();
        let mut session = ChatSession::new(LocalBackend::new(chat.clone()));
        session.load_rooms().await;
        session.unlock("pw").await;
        session.set_display_name("Ana");
        session.take_notices();

        assert_eq!(session.send_text("   ").await, None);
        assert!(session.take_notices().is_empty());
        assert!(chat.store().list_messages(general.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn switching_rooms_relocks_and_resets_the_feed() {
        let chat = test_chat().await;
        let general = chat.create_room("general", "pw").await.unwrap();
        let random = chat.create_room("random", "pw2").await.unwrap();
        chat.post_message(
            general.id,
            NewMessage { username: "Bo".to_owned(), message: "old".to_owned() },
        )
        .await
        .unwrap();

        let mut session = ChatSession::new(LocalBackend::new(chat.clone()));
        session.load_rooms().await;
        assert!(session.unlock("pw").await);
        assert_eq!(session.messages().len(), 1);

        session.select_room(random.id);
        assert_eq!(session.gate().state(), GateState::Locked(random.id));
        assert_eq!(session.feed_state(), FeedState::Unsubscribed);
        assert!(session.messages().is_empty());
        assert_eq!(chat.feed().subscriber_count(), 0);

        assert!(session.unlock("pw2").await);
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn failed_send_raises_a_notice() {
        let chat = test_chat().await;
        let general = chat.create_room("general", "pw").await.unwrap();
        let mut session = ChatSession::new(LocalBackend::new(chat.clone()));
        session.load_rooms().await;
        session.unlock("pw").await;
        session.set_display_name("Ana");
        session.take_notices();

        chat.delete_room(general.id).await.unwrap();
        assert_eq!(session.send_text("hello?").await, None);
        assert_eq!(session.draft(), "");
        let notice = session.take_notices().pop().unwrap();
        assert_eq!(notice.description, "Failed to send message. Please try again.");
    }
}
