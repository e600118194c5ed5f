use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{AppError, AppResult};

pub const UNLOCKED_ROOMS: &str = "unlocked_rooms";
pub const ADMIN: &str = "admin";

pub const ACCESS_DENIED: &str = "You don't have admin privileges.";

/// Who signed in to the admin console, and what the role check said at
/// sign-in. Not refreshed until the next login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminClaims {
    pub user_id: Uuid,
    pub is_admin: bool,
}

pub async fn unlocked_rooms(session: &Session) -> AppResult<BTreeSet<Uuid>> {
    Ok(session.get(UNLOCKED_ROOMS).await?.unwrap_or_default())
}

pub async fn is_unlocked(session: &Session, room_id: Uuid) -> AppResult<bool> {
    Ok(unlocked_rooms(session).await?.contains(&room_id))
}

pub async fn mark_unlocked(session: &Session, room_id: Uuid) -> AppResult<()> {
    let mut rooms = unlocked_rooms(session).await?;
    if rooms.insert(room_id) {
        session.insert(UNLOCKED_ROOMS, rooms).await?;
    }
    Ok(())
}

pub async fn require_unlocked(session: &Session, room_id: Uuid) -> AppResult<()> {
    if is_unlocked(session, room_id).await? {
        Ok(())
    } else {
        Err(AppError::forbidden("room is locked"))
    }
}

pub async fn admin_claims(session: &Session) -> AppResult<Option<AdminClaims>> {
    Ok(session.get(ADMIN).await?)
}

/// The signed-in admin's id, or 401/403.
pub async fn require_admin(session: &Session) -> AppResult<Uuid> {
    match admin_claims(session).await? {
        None => Err(AppError::unauthorized("not signed in")),
        Some(AdminClaims { is_admin: false, .. }) => Err(AppError::forbidden(ACCESS_DENIED)),
        Some(AdminClaims { user_id, .. }) => Ok(user_id),
    }
}
