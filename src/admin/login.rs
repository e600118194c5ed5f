use axum::{Json, debug_handler, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::{
    AppError, AppResult,
    chat::Chat,
    model::Role,
    session::{self, ADMIN, AdminClaims},
};

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct SessionStatus {
    authenticated: bool,
    is_admin: bool,
}

impl From<Option<AdminClaims>> for SessionStatus {
    fn from(claims: Option<AdminClaims>) -> Self {
        SessionStatus {
            authenticated: claims.is_some(),
            is_admin: claims.is_some_and(|c| c.is_admin),
        }
    }
}

/// Signs in, then checks the role table once. The outcome is pinned in the
/// session until logout.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn login(
    State(chat): State<Chat>,
    session: Session,

    Json(LoginRequest { email, password }): Json<LoginRequest>,
) -> AppResult<Json<SessionStatus>> {
    let Some(account) = chat.store().verify_credentials(&email, &password).await? else {
        tracing::info!(email = %email, "admin login refused");
        return Err(AppError::unauthorized("Invalid login credentials"));
    };

    let is_admin = chat.store().has_role(account.id, Role::Admin).await?;
    let claims = AdminClaims {
        user_id: account.id,
        is_admin,
    };

    session.cycle_id().await?;
    session.insert(ADMIN, claims).await?;

    tracing::info!(user_id = %account.id, is_admin, "admin login");
    Ok(Json(Some(claims).into()))
}

#[debug_handler]
pub(crate) async fn session_status(session: Session) -> AppResult<Json<SessionStatus>> {
    Ok(Json(session::admin_claims(&session).await?.into()))
}
