use axum::{
    debug_handler,
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message as WsMessage, WebSocket},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    chat::Chat,
    feed::{Filter, Subscription},
    model::NewMessage,
    AppResult, session,
};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn room_ws(
    Path(room_id): Path<Uuid>,
    State(chat): State<Chat>,
    session: Session,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    session::require_unlocked(&session, room_id).await?;

    // Subscribed before the upgrade so nothing published during the
    // handshake is missed.
    let subscription = chat.subscribe(Filter::room_messages(room_id));

    Ok(ws.on_upgrade(move |socket| serve_socket(socket, chat, subscription, Some(room_id))))
}

/// Pushes feed events to the socket. When `room_id` is set, inbound text
/// frames are parsed as messages to post to that room; a rejected post is
/// answered on the same socket with `{"error": ...}`.
pub(crate) async fn serve_socket(
    socket: WebSocket,
    chat: Chat,
    mut subscription: Subscription,
    room_id: Option<Uuid>,
) {
    let (mut sender, mut receiver) = socket.split();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<String>();
    let filter = subscription.filter();
    tracing::debug!(?filter, "subscriber connected");

    let mut forward_task = tokio::spawn(async move {
        loop {
            let text = tokio::select! {
                event = subscription.recv() => match event {
                    Some(event) => match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(_) => continue,
                    },
                    None => break,
                },
                Some(reply) = reply_rx.recv() => reply,
            };
            if sender.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let WsMessage::Text(text) = msg else {
                if matches!(msg, WsMessage::Close(_)) {
                    break;
                }
                continue;
            };
            let Some(room_id) = room_id else {
                continue;
            };

            let posted = match serde_json::from_str::<NewMessage>(text.as_str()) {
                Ok(draft) => chat.post_message(room_id, draft).await.map(|_| ()).map_err(|e| e.to_string()),
                Err(e) => Err(format!("malformed message: {e}")),
            };
            if let Err(error) = posted {
                tracing::info!(room_id = %room_id, error = %error, "socket message rejected");
                let _ = reply_tx.send(json!({ "error": error }).to_string());
            }
        }
    });

    tokio::select! {
        _ = &mut forward_task => receive_task.abort(),
        _ = &mut receive_task => forward_task.abort(),
    };
    tracing::debug!(?filter, "subscriber disconnected");
}
