mod login;
mod logout;
mod messages;
mod rooms;
mod setup;
mod ws;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::AppState;

pub use setup::{Bootstrap, ensure_admin, setup_admin};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login::login))
        .route("/logout", post(logout::logout))
        .route("/session", get(login::session_status))
        .route("/rooms", get(rooms::list_rooms).post(rooms::create_room))
        .route("/rooms/{room_id}", delete(rooms::delete_room))
        .route("/messages", get(messages::list_messages))
        .route("/messages/{id}", delete(messages::delete_message))
        .route("/ws", get(ws::admin_ws))
}
