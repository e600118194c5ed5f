mod msg;
mod room;
pub(crate) mod ws;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(room::list_rooms))
        .route("/{room_id}/unlock", post(room::unlock))
        .route("/{room_id}/messages", get(msg::history).post(msg::send))
        .route("/{room_id}/ws", get(ws::room_ws))
}
