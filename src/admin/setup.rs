use std::sync::Arc;

use axum::{
    Json, debug_handler,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    chat::Chat,
    config::{AdminCredentials, Config},
    model::Role,
    store::{Store, StoreError, StoreResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootstrap {
    /// Fresh account, role granted.
    Created,
    /// Account existed without the role; role granted now.
    RoleGranted,
    AlreadyProvisioned,
}

/// Makes sure the configured admin account exists and holds the admin role.
/// Safe to call any number of times.
pub async fn ensure_admin(store: &Store, credentials: &AdminCredentials) -> StoreResult<Bootstrap> {
    let created = store
        .create_account(&credentials.email, &credentials.password, Some(&credentials.username))
        .await;

    match created {
        Ok(account) => {
            store.grant_role(account.id, Role::Admin).await?;
            tracing::info!(email = %account.email, "admin account created");
            Ok(Bootstrap::Created)
        }
        Err(StoreError::AlreadyRegistered) => {
            let account = store
                .account_by_email(&credentials.email)
                .await?
                .ok_or(StoreError::NotFound("admin account"))?;

            if store.grant_role(account.id, Role::Admin).await? {
                tracing::info!(email = %account.email, "admin role granted to existing account");
                Ok(Bootstrap::RoleGranted)
            } else {
                Ok(Bootstrap::AlreadyProvisioned)
            }
        }
        Err(e) => Err(e),
    }
}

/// `POST /setup-admin`: `{message}` with 200, or `{error}` with 400.
#[debug_handler(state = crate::AppState)]
pub async fn setup_admin(
    State(chat): State<Chat>,
    State(config): State<Arc<Config>>,
) -> Response {
    let Some(credentials) = config.admin.as_ref() else {
        return setup_error("admin credentials are not configured");
    };

    match ensure_admin(chat.store(), credentials).await {
        Ok(Bootstrap::Created) => (
            StatusCode::OK,
            Json(json!({
                "message": "Admin user created successfully",
                "email": credentials.email,
            })),
        )
            .into_response(),
        Ok(Bootstrap::RoleGranted | Bootstrap::AlreadyProvisioned) => (
            StatusCode::OK,
            Json(json!({ "message": "Admin user already exists and has admin role" })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "admin setup failed");
            setup_error(&e.to_string())
        }
    }
}

fn setup_error(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}
