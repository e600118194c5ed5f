use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{AppResult, chat::Chat, model::Room, session};

#[derive(Debug, Deserialize)]
pub(crate) struct UnlockRequest {
    password: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct UnlockResponse {
    unlocked: bool,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list_rooms(State(chat): State<Chat>) -> AppResult<Json<Vec<Room>>> {
    Ok(Json(chat.store().list_rooms().await?))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn unlock(
    Path(room_id): Path<Uuid>,
    State(chat): State<Chat>,
    session: Session,

    Json(UnlockRequest { password }): Json<UnlockRequest>,
) -> AppResult<Json<UnlockResponse>> {
    if password.is_empty() {
        return Err("Please select a room and enter password.")?;
    }

    let unlocked = chat.store().verify_room_password(room_id, &password).await?;
    if unlocked {
        session::mark_unlocked(&session, room_id).await?;
        tracing::info!(room_id = %room_id, "room unlocked");
    } else {
        tracing::info!(room_id = %room_id, "room unlock refused");
    }

    Ok(Json(UnlockResponse { unlocked }))
}
