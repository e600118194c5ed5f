#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use gatechat::{
    AppState, app,
    chat::Chat,
    config::{AdminCredentials, Config, PasswordCost},
    feed::ChangeFeed,
    store::Store,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "root@example.com";
pub const ADMIN_PASSWORD: &str = "correct horse battery";

pub fn cheap_passwords() -> PasswordCost {
    PasswordCost {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    }
}

pub async fn test_state(with_admin: bool) -> Result<AppState> {
    let store = Store::in_memory(cheap_passwords()).await?;
    let config = Config {
        admin: with_admin.then(|| AdminCredentials {
            email: ADMIN_EMAIL.to_owned(),
            password: ADMIN_PASSWORD.to_owned(),
            username: "root".to_owned(),
        }),
        password_cost: cheap_passwords(),
        ..Config::default()
    };
    Ok(AppState {
        chat: Chat::new(store, ChangeFeed::new(64)),
        config: Arc::new(config),
    })
}

pub struct Reply {
    pub status: StatusCode,
    pub cookie: Option<String>,
    pub body: Value,
}

/// One request through the router, carrying and returning the session
/// cookie.
pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Result<Reply> {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => request.body(Body::empty())?,
    };

    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_owned);
    let bytes = response.into_body().collect().await?.to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    Ok(Reply { status, cookie, body })
}
