use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{AppResult, chat::Chat, model::Room, session};

#[derive(Debug, Deserialize)]
pub(crate) struct NewRoomRequest {
    name: String,
    password: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_rooms(
    State(chat): State<Chat>,
    session: Session,
) -> AppResult<Json<Vec<Room>>> {
    session::require_admin(&session).await?;

    Ok(Json(chat.store().list_rooms().await?))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn create_room(
    State(chat): State<Chat>,
    session: Session,

    Json(NewRoomRequest { name, password }): Json<NewRoomRequest>,
) -> AppResult<(StatusCode, Json<Room>)> {
    session::require_admin(&session).await?;

    let room = chat.create_room(&name, &password).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete_room(
    Path(room_id): Path<Uuid>,
    State(chat): State<Chat>,
    session: Session,
) -> AppResult<StatusCode> {
    session::require_admin(&session).await?;

    chat.delete_room(room_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
