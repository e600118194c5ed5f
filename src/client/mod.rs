//! Chat participant side: room gate, display name, live message feed and
//! composer, driven against any [`ChatBackend`].

mod composer;
mod feed;
mod gate;
mod http;
mod identity;
mod local;
mod notice;
mod session;

use std::future::Future;

use thiserror::Error;
use uuid::Uuid;

use crate::{
    feed::ChangeEvent,
    model::{MAX_USERNAME_CHARS, Message, NewMessage, Room},
    store::StoreError,
};

pub use composer::Composer;
pub use feed::{Applied, FeedState, MessageFeed};
pub use gate::{GateState, RoomGate};
pub use http::{HttpBackend, WsSubscription};
pub use identity::Identity;
pub use local::LocalBackend;
pub use notice::{Notice, NoticeLevel};
pub use session::ChatSession;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Anything the backend reported, message passed through as is.
    #[error("{0}")]
    Backend(String),
    #[error("no room selected")]
    NoRoom,
    #[error("password is required")]
    MissingPassword,
    #[error("room is locked")]
    Locked,
    #[error("no display name set")]
    NoIdentity,
    #[error("display name must be 1 to {MAX_USERNAME_CHARS} characters")]
    InvalidName,
    #[error("message is empty")]
    EmptyMessage,
}

impl From<StoreError> for ClientError {
    fn from(err: StoreError) -> Self {
        ClientError::Backend(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Backend(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Backend(err.to_string())
    }
}

/// A stream of change events for one subscription. Dropping it
/// unsubscribes.
pub trait EventSource: Send {
    /// `None` once the subscription has ended.
    fn next_event(&mut self) -> impl Future<Output = Option<ChangeEvent>> + Send;
}

impl EventSource for crate::feed::Subscription {
    async fn next_event(&mut self) -> Option<ChangeEvent> {
        self.recv().await
    }
}

/// The calls a chat participant makes.
pub trait ChatBackend: Send + Sync {
    type Subscription: EventSource;

    fn list_rooms(&self) -> impl Future<Output = Result<Vec<Room>, ClientError>> + Send;

    fn verify_room_password(
        &self,
        room_id: Uuid,
        password: &str,
    ) -> impl Future<Output = Result<bool, ClientError>> + Send;

    /// History of one room, oldest first.
    fn list_messages(&self, room_id: Uuid) -> impl Future<Output = Result<Vec<Message>, ClientError>> + Send;

    fn insert_message(
        &self,
        room_id: Uuid,
        draft: NewMessage,
    ) -> impl Future<Output = Result<Message, ClientError>> + Send;

    /// Insert/delete events for messages of one room.
    fn subscribe(&self, room_id: Uuid) -> impl Future<Output = Result<Self::Subscription, ClientError>> + Send;
}
