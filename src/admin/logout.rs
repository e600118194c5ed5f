use axum::{debug_handler, http::StatusCode};
use tower_sessions::Session;

use crate::{AppResult, session::ADMIN};

/// Drops the admin identity. Room unlocks held by the same browser survive.
#[debug_handler]
pub(crate) async fn logout(session: Session) -> AppResult<StatusCode> {
    session.remove_value(ADMIN).await?;
    Ok(StatusCode::NO_CONTENT)
}
