//! In-process change feed: every committed write publishes a typed event,
//! subscribers pick events by table and optional room.

use futures_util::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::model::{Message, Room};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Rooms,
    Messages,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    MessageInserted { record: Message },
    MessageDeleted { id: Uuid, room_id: Uuid },
    RoomCreated { record: Room },
    RoomDeleted { id: Uuid },
}

impl ChangeEvent {
    pub fn table(&self) -> Table {
        match self {
            ChangeEvent::MessageInserted { .. } | ChangeEvent::MessageDeleted { .. } => Table::Messages,
            ChangeEvent::RoomCreated { .. } | ChangeEvent::RoomDeleted { .. } => Table::Rooms,
        }
    }

    pub fn room_id(&self) -> Uuid {
        match self {
            ChangeEvent::MessageInserted { record } => record.room_id,
            ChangeEvent::MessageDeleted { room_id, .. } => *room_id,
            ChangeEvent::RoomCreated { record } => record.id,
            ChangeEvent::RoomDeleted { id } => *id,
        }
    }
}

/// Which events a subscription wants. `None` fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Filter {
    pub table: Option<Table>,
    pub room_id: Option<Uuid>,
}

impl Filter {
    pub fn everything() -> Filter {
        Filter::default()
    }

    pub fn room_messages(room_id: Uuid) -> Filter {
        Filter {
            table: Some(Table::Messages),
            room_id: Some(room_id),
        }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        self.table.is_none_or(|table| table == event.table())
            && self.room_id.is_none_or(|room_id| room_id == event.room_id())
    }
}

#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> ChangeFeed {
        ChangeFeed {
            tx: broadcast::channel(capacity.max(1)).0,
        }
    }

    /// Returns how many subscriptions were live when the event went out.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        tracing::debug!(?event, "publish");
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self, filter: Filter) -> Subscription {
        Subscription {
            filter,
            rx: Some(self.tx.subscribe()),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// A cancellable, filtered view of the feed. Dropping it (or calling
/// [`Subscription::close`]) unsubscribes.
pub struct Subscription {
    filter: Filter,
    rx: Option<broadcast::Receiver<ChangeEvent>>,
}

impl Subscription {
    pub fn filter(&self) -> Filter {
        self.filter
    }

    /// Next matching event, or `None` once closed. Events lost to lag are
    /// skipped, there is no replay.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, filter = ?self.filter, "subscriber lagged, events dropped");
                    continue;
                }
                Err(RecvError::Closed) => {
                    self.rx = None;
                    return None;
                }
            }
        }
    }

    pub fn close(&mut self) {
        self.rx = None;
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_none()
    }

    pub fn into_stream(self) -> impl Stream<Item = ChangeEvent> + Send {
        futures_util::stream::unfold(self, |mut subscription| async move {
            let event = subscription.recv().await?;
            Some((event, subscription))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::StreamExt;

    use crate::model::timestamp_from_nanos;

    use super::*;

    fn message(room_id: Uuid, body: &str) -> Message {
        Message {
            id: Uuid::now_v7(),
            room_id,
            username: "Ana".to_owned(),
            message: body.to_owned(),
            created_at: timestamp_from_nanos(1),
        }
    }

    #[tokio::test]
    async fn room_filter_only_sees_its_room() {
        let feed = ChangeFeed::new(16);
        let general = Uuid::now_v7();
        let random = Uuid::now_v7();
        let mut sub = feed.subscribe(Filter::room_messages(general));

        feed.publish(ChangeEvent::MessageInserted { record: message(random, "no") });
        feed.publish(ChangeEvent::RoomDeleted { id: general });
        let wanted = message(general, "yes");
        feed.publish(ChangeEvent::MessageInserted { record: wanted.clone() });
        feed.publish(ChangeEvent::MessageDeleted { id: wanted.id, room_id: general });

        assert_eq!(sub.recv().await, Some(ChangeEvent::MessageInserted { record: wanted.clone() }));
        assert_eq!(sub.recv().await, Some(ChangeEvent::MessageDeleted { id: wanted.id, room_id: general }));
    }

    #[tokio::test]
    async fn unfiltered_sees_everything() {
        let feed = ChangeFeed::new(16);
        let stream = feed.subscribe(Filter::everything()).into_stream();
        let room = Uuid::now_v7();
        feed.publish(ChangeEvent::RoomDeleted { id: room });
        feed.publish(ChangeEvent::MessageDeleted { id: Uuid::now_v7(), room_id: Uuid::now_v7() });

        let events: Vec<_> = stream.take(2).collect().await;
        assert_eq!(events[0], ChangeEvent::RoomDeleted { id: room });
        assert_eq!(events[1].table(), Table::Messages);
    }

    #[tokio::test]
    async fn closing_unsubscribes() {
        let feed = ChangeFeed::new(16);
        let mut sub = feed.subscribe(Filter::everything());
        assert_eq!(feed.subscriber_count(), 1);

        sub.close();
        assert!(sub.is_closed());
        assert_eq!(feed.subscriber_count(), 0);
        assert_eq!(feed.publish(ChangeEvent::RoomDeleted { id: Uuid::now_v7() }), 0);
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_ahead() {
        let feed = ChangeFeed::new(2);
        let room = Uuid::now_v7();
        let mut sub = feed.subscribe(Filter::room_messages(room));
        let bodies = ["a", "b", "c", "d"];
        let sent: Vec<_> = bodies.iter().map(|b| message(room, b)).collect();
        for m in &sent {
            feed.publish(ChangeEvent::MessageInserted { record: m.clone() });
        }

        let next = tokio::time::timeout(Duration::from_secs(1), sub.recv()).await.unwrap();
        assert_eq!(next, Some(ChangeEvent::MessageInserted { record: sent[2].clone() }));
    }

    #[test]
    fn wire_format_is_tagged() {
        let id = Uuid::now_v7();
        let room_id = Uuid::now_v7();
        let json = serde_json::to_value(ChangeEvent::MessageDeleted { id, room_id }).unwrap();
        assert_eq!(json["type"], "message_deleted");
        assert_eq!(json["id"], id.to_string());
        assert_eq!(json["room_id"], room_id.to_string());
    }
}
