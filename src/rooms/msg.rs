use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    AppResult,
    chat::Chat,
    model::{Message, NewMessage},
    session,
};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn history(
    Path(room_id): Path<Uuid>,
    State(chat): State<Chat>,
    session: Session,
) -> AppResult<Json<Vec<Message>>> {
    session::require_unlocked(&session, room_id).await?;

    Ok(Json(chat.store().list_messages(room_id).await?))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn send(
    Path(room_id): Path<Uuid>,
    State(chat): State<Chat>,
    session: Session,

    Json(draft): Json<NewMessage>,
) -> AppResult<(StatusCode, Json<Message>)> {
    session::require_unlocked(&session, room_id).await?;

    let message = chat.post_message(room_id, draft).await?;
    Ok((StatusCode::CREATED, Json(message)))
}
