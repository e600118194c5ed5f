use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::{
    Response, Url,
    cookie::{CookieStore, Jar},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream,
    tungstenite::{
        Message as WsMessage,
        client::IntoClientRequest,
        http::{HeaderValue, header::COOKIE},
    },
};
use uuid::Uuid;

use crate::{
    feed::ChangeEvent,
    model::{Message, NewMessage, Room},
};

use super::{ChatBackend, ClientError, EventSource};

#[derive(Serialize)]
struct UnlockRequest<'a> {
    password: &'a str,
}

#[derive(Deserialize)]
struct UnlockResponse {
    unlocked: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for the JSON API and room sockets. Keeps the session cookie, so
/// rooms unlocked through one instance stay unlocked for it.
#[derive(Clone)]
pub struct HttpBackend {
    base: Url,
    http: reqwest::Client,
    jar: Arc<Jar>,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<HttpBackend, ClientError> {
        let mut base = base_url.to_owned();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).map_err(|e| ClientError::Backend(format!("bad base url {base_url}: {e}")))?;

        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder().cookie_provider(jar.clone()).build()?;

        Ok(HttpBackend { base, http, jar })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path)
            .map_err(|e| ClientError::Backend(format!("bad path {path}: {e}")))
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(ErrorBody { error }) => Err(ClientError::Backend(error)),
        Err(_) if text.is_empty() => Err(ClientError::Backend(status.to_string())),
        Err(_) => Err(ClientError::Backend(format!("{status}: {text}"))),
    }
}

impl ChatBackend for HttpBackend {
    type Subscription = WsSubscription;

    async fn list_rooms(&self) -> Result<Vec<Room>, ClientError> {
        let response = self.http.get(self.url("api/rooms")?).send().await?;
        read_json(response).await
    }

    async fn verify_room_password(&self, room_id: Uuid, password: &str) -> Result<bool, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("api/rooms/{room_id}/unlock"))?)
            .json(&UnlockRequest { password })
            .send()
            .await?;
        let UnlockResponse { unlocked } = read_json(response).await?;
        Ok(unlocked)
    }

    async fn list_messages(&self, room_id: Uuid) -> Result<Vec<Message>, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("api/rooms/{room_id}/messages"))?)
            .send()
            .await?;
        read_json(response).await
    }

    async fn insert_message(&self, room_id: Uuid, draft: NewMessage) -> Result<Message, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("api/rooms/{room_id}/messages"))?)
            .json(&draft)
            .send()
            .await?;
        read_json(response).await
    }

    async fn subscribe(&self, room_id: Uuid) -> Result<WsSubscription, ClientError> {
        let http_url = self.url(&format!("api/rooms/{room_id}/ws"))?;
        let mut ws_url = http_url.clone();
        let scheme = if http_url.scheme() == "https" { "wss" } else { "ws" };
        ws_url
            .set_scheme(scheme)
            .map_err(|()| ClientError::Backend(format!("cannot switch {http_url} to {scheme}")))?;

        let mut request = ws_url.as_str().into_client_request()?;
        if let Some(cookie) = self.jar.cookies(&http_url) {
            let cookie = HeaderValue::from_bytes(cookie.as_bytes())
                .map_err(|e| ClientError::Backend(e.to_string()))?;
            request.headers_mut().insert(COOKIE, cookie);
        }

        let (stream, _) = tokio_tungstenite::connect_async(request).await?;
        tracing::debug!(room_id = %room_id, "room socket open");
        Ok(WsSubscription { stream })
    }
}

/// Change events arriving over a room socket.
pub struct WsSubscription {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl EventSource for WsSubscription {
    async fn next_event(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.stream.next().await? {
                Ok(WsMessage::Text(text)) => match serde_json::from_str(text.as_str()) {
                    Ok(event) => return Some(event),
                    Err(e) => tracing::warn!(error = %e, "unreadable feed frame"),
                },
                Ok(WsMessage::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }
}
