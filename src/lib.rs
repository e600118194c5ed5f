pub mod admin;
pub mod chat;
pub mod client;
pub mod config;
pub mod feed;
pub mod model;
pub mod res;
pub mod rooms;
pub mod session;
pub mod store;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::FromRef,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};

use chat::Chat;
use config::Config;
use store::StoreError;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub chat: Chat,
    pub config: Arc<Config>,
}

pub fn app(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            state.config.session_idle_minutes,
        )));

    Router::new()
        .route("/", get(res::index_page))
        .route("/admin", get(res::admin_page))
        .route("/setup-admin", post(admin::setup_admin))

        .nest("/api/rooms", rooms::router())
        .nest("/api/admin", admin::router())

        .with_state(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}

pub type AppResult<T> = Result<T, AppError>;

/// Any failure a handler can hit. Rendered as `{"error": "..."}` so the
/// page can show it verbatim.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: anyhow::Error,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> AppError {
        AppError {
            status,
            error: anyhow::Error::msg(message.into()),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> AppError {
        AppError::new(StatusCode::FORBIDDEN, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> AppError {
        AppError::new(StatusCode::UNAUTHORIZED, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = ?self.error, "request failed");
        }
        (self.status, Json(json!({ "error": self.error.to_string() }))).into_response()
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::new(StatusCode::BAD_REQUEST, err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
            StoreError::AlreadyRegistered => StatusCode::CONFLICT,
            StoreError::Database(_) | StoreError::Hash(_) | StoreError::Corrupt(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        AppError {
            status,
            error: anyhow::Error::from(err),
        }
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: anyhow::Error::from(err),
        }
    }
}
