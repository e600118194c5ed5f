use uuid::Uuid;

use crate::{feed::ChangeEvent, model::Message};

use super::{ChatBackend, ClientError, EventSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Unsubscribed,
    Loading,
    Live,
}

/// What an event did to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Appended,
    /// Arrived out of order and was placed at this index.
    InsertedAt(usize),
    Removed,
    Ignored,
}

/// Ordered message list of one room, kept current by a room-scoped
/// subscription.
pub struct MessageFeed<S> {
    room_id: Option<Uuid>,
    state: FeedState,
    messages: Vec<Message>,
    subscription: Option<S>,
}

impl<S> Default for MessageFeed<S> {
    fn default() -> Self {
        MessageFeed {
            room_id: None,
            state: FeedState::Unsubscribed,
            messages: Vec::new(),
            subscription: None,
        }
    }
}

impl<S: EventSource> MessageFeed<S> {
    pub fn new() -> MessageFeed<S> {
        MessageFeed::default()
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    pub fn room_id(&self) -> Option<Uuid> {
        self.room_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Tears down whatever was open, subscribes to `room_id`, then loads its
    /// history. Subscribing first means a write racing the load shows up in
    /// both; [`MessageFeed::apply`] drops the duplicate.
    pub async fn open<B>(&mut self, backend: &B, room_id: Uuid) -> Result<(), ClientError>
    where
        B: ChatBackend<Subscription = S>,
    {
        self.close();
        self.room_id = Some(room_id);
        self.state = FeedState::Loading;

        let loaded = async {
            let subscription = backend.subscribe(room_id).await?;
            let history = backend.list_messages(room_id).await?;
            Ok::<_, ClientError>((subscription, history))
        }
        .await;

        let (subscription, mut history) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                self.close();
                return Err(e);
            }
        };

        history.retain(|m| m.room_id == room_id);
        history.sort_by_key(Message::sort_key);
        history.dedup_by_key(|m| m.id);

        tracing::debug!(room_id = %room_id, count = history.len(), "feed live");
        self.messages = history;
        self.subscription = Some(subscription);
        self.state = FeedState::Live;
        Ok(())
    }

    pub fn close(&mut self) {
        self.subscription = None;
        self.room_id = None;
        self.messages.clear();
        self.state = FeedState::Unsubscribed;
    }

    pub fn apply(&mut self, event: ChangeEvent) -> Applied {
        let Some(room_id) = self.room_id else {
            return Applied::Ignored;
        };

        match event {
            ChangeEvent::MessageInserted { record } if record.room_id == room_id => {
                if self.messages.iter().any(|m| m.id == record.id) {
                    return Applied::Ignored;
                }
                let key = record.sort_key();
                let at = self.messages.partition_point(|m| m.sort_key() <= key);
                if at == self.messages.len() {
                    self.messages.push(record);
                    Applied::Appended
                } else {
                    self.messages.insert(at, record);
                    Applied::InsertedAt(at)
                }
            }
            ChangeEvent::MessageDeleted { id, room_id: from } if from == room_id => {
                match self.messages.iter().position(|m| m.id == id) {
                    Some(at) => {
                        self.messages.remove(at);
                        Applied::Removed
                    }
                    None => Applied::Ignored,
                }
            }
            _ => Applied::Ignored,
        }
    }

    /// Waits for the next event and applies it. `None` when nothing is
    /// subscribed or the subscription ended; the list is kept in that case.
    pub async fn pump(&mut self) -> Option<Applied> {
        let subscription = self.subscription.as_mut()?;
        match subscription.next_event().await {
            Some(event) => Some(self.apply(event)),
            None => {
                tracing::debug!(room_id = ?self.room_id, "feed subscription ended");
                self.subscription = None;
                self.state = FeedState::Unsubscribed;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use time::OffsetDateTime;

    use crate::{
        chat::test_chat,
        client::LocalBackend,
        feed::Subscription,
        model::{NewMessage, timestamp_from_nanos},
    };

    use super::*;

    fn message(room_id: Uuid, nanos: i64, body: &str) -> Message {
        Message {
            id: Uuid::now_v7(),
            room_id,
            username: "Ana".to_owned(),
            message: body.to_owned(),
            created_at: timestamp_from_nanos(nanos),
        }
    }

    fn draft(body: &str) -> NewMessage {
        NewMessage {
            username: "Ana".to_owned(),
            message: body.to_owned(),
        }
    }

    /// A feed already attached to `room_id` with no live subscription.
    fn detached(room_id: Uuid, messages: Vec<Message>) -> MessageFeed<Subscription> {
        MessageFeed {
            room_id: Some(room_id),
            state: FeedState::Live,
            messages,
            subscription: None,
        }
    }

    #[test]
    fn insert_appends_exactly_one() {
        let room = Uuid::now_v7();
        let mut feed = detached(room, vec![message(room, 10, "a")]);
        let b = message(room, 20, "b");

        assert_eq!(feed.apply(ChangeEvent::MessageInserted { record: b.clone() }), Applied::Appended);
        assert_eq!(feed.messages().len(), 2);
        assert_eq!(feed.messages()[1], b);

        assert_eq!(feed.apply(ChangeEvent::MessageInserted { record: b }), Applied::Ignored);
        assert_eq!(feed.messages().len(), 2);
    }

    #[test]
    fn late_insert_lands_in_timestamp_order() {
        let room = Uuid::now_v7();
        let a = message(room, 10, "a");
        let c = message(room, 30, "c");
        let mut feed = detached(room, vec![a.clone(), c.clone()]);
        let b = message(room, 20, "b");

        assert_eq!(feed.apply(ChangeEvent::MessageInserted { record: b.clone() }), Applied::InsertedAt(1));
        assert_eq!(feed.messages(), &[a, b, c]);
    }

    #[test]
    fn delete_removes_only_the_matching_id() {
        let room = Uuid::now_v7();
        let a = message(room, 10, "a");
        let b = message(room, 20, "b");
        let c = message(room, 30, "c");
        let mut feed = detached(room, vec![a.clone(), b.clone(), c.clone()]);

        assert_eq!(feed.apply(ChangeEvent::MessageDeleted { id: b.id, room_id: room }), Applied::Removed);
        assert_eq!(feed.messages(), &[a.clone(), c.clone()]);

        assert_eq!(feed.apply(ChangeEvent::MessageDeleted { id: b.id, room_id: room }), Applied::Ignored);
        assert_eq!(feed.messages(), &[a, c]);
    }

    #[test]
    fn other_rooms_never_leak_in() {
        let room = Uuid::now_v7();
        let elsewhere = Uuid::now_v7();
        let kept = message(room, 10, "kept");
        let mut feed = detached(room, vec![kept.clone()]);

        let stray = message(elsewhere, 20, "stray");
        assert_eq!(feed.apply(ChangeEvent::MessageInserted { record: stray }), Applied::Ignored);
        assert_eq!(
            feed.apply(ChangeEvent::MessageDeleted { id: kept.id, room_id: elsewhere }),
            Applied::Ignored
        );
        assert_eq!(feed.messages(), &[kept]);
    }

    #[tokio::test]
    async fn open_loads_sorted_history_then_goes_live() {
        let chat = test_chat().await;
        let room = chat.create_room("general", "secret123").await.unwrap();
        let first = chat.post_message(room.id, draft("first")).await.unwrap();
        let second = chat.post_message(room.id, draft("second")).await.unwrap();
        let backend = LocalBackend::new(chat.clone());

        let mut feed: MessageFeed<Subscription> = MessageFeed::new();
        assert_eq!(feed.state(), FeedState::Unsubscribed);
        feed.open(&backend, room.id).await.unwrap();
        assert_eq!(feed.state(), FeedState::Live);
        assert_eq!(feed.messages(), &[first, second]);
        assert!(feed.messages().windows(2).all(|w| w[0].created_at <= w[1].created_at));

        let third = chat.post_message(room.id, draft("third")).await.unwrap();
        assert_eq!(feed.pump().await, Some(Applied::Appended));
        assert_eq!(feed.messages().last(), Some(&third));

        chat.delete_message(third.id).await.unwrap();
        assert_eq!(feed.pump().await, Some(Applied::Removed));
        assert_eq!(feed.messages().len(), 2);
    }

    #[tokio::test]
    async fn switching_rooms_drops_the_old_subscription() {
        let chat = test_chat().await;
        let general = chat.create_room("general", "pw").await.unwrap();
        let random = chat.create_room("random", "pw").await.unwrap();
        let backend = LocalBackend::new(chat.clone());

        let mut feed: MessageFeed<Subscription> = MessageFeed::new();
        feed.open(&backend, general.id).await.unwrap();
        assert_eq!(chat.feed().subscriber_count(), 1);

        feed.open(&backend, random.id).await.unwrap();
        assert_eq!(chat.feed().subscriber_count(), 1);
        assert_eq!(feed.room_id(), Some(random.id));

        chat.post_message(general.id, draft("old room")).await.unwrap();
        let fresh = chat.post_message(random.id, draft("new room")).await.unwrap();

        let applied = tokio::time::timeout(Duration::from_secs(1), feed.pump()).await.unwrap();
        assert_eq!(applied, Some(Applied::Appended));
        assert_eq!(feed.messages(), &[fresh]);

        feed.close();
        assert_eq!(feed.state(), FeedState::Unsubscribed);
        assert!(feed.messages().is_empty());
        assert_eq!(chat.feed().subscriber_count(), 0);
        assert_eq!(feed.pump().await, None);
    }

    #[tokio::test]
    async fn pump_without_subscription_is_none() {
        let mut feed: MessageFeed<Subscription> = MessageFeed::new();
        assert_eq!(feed.pump().await, None);
        let room = Uuid::now_v7();
        let m = message(room, OffsetDateTime::now_utc().unix_timestamp_nanos() as i64, "x");
        assert_eq!(feed.apply(ChangeEvent::MessageInserted { record: m }), Applied::Ignored);
    }
}
