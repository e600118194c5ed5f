use axum::{
    debug_handler,
    extract::{State, WebSocketUpgrade},
    response::Response,
};
use tower_sessions::Session;

use crate::{AppResult, chat::Chat, feed::Filter, rooms::ws::serve_socket, session};

/// Unfiltered feed for the console; inbound frames are ignored.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn admin_ws(
    State(chat): State<Chat>,
    session: Session,

    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    session::require_admin(&session).await?;

    let subscription = chat.subscribe(Filter::everything());
    Ok(ws.on_upgrade(move |socket| serve_socket(socket, chat, subscription, None)))
}
