use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{AppResult, chat::Chat, model::Message, session};

/// Every room's messages, newest first.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_messages(
    State(chat): State<Chat>,
    session: Session,
) -> AppResult<Json<Vec<Message>>> {
    session::require_admin(&session).await?;

    Ok(Json(chat.store().list_all_messages().await?))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete_message(
    Path(id): Path<Uuid>,
    State(chat): State<Chat>,
    session: Session,
) -> AppResult<StatusCode> {
    let user_id = session::require_admin(&session).await?;

    let message = chat.delete_message(id).await?;
    tracing::info!(by = %user_id, id = %message.id, room_id = %message.room_id, "message moderated");
    Ok(StatusCode::NO_CONTENT)
}
