use std::sync::Arc;

use anyhow::Context;
use gatechat::{AppState, admin, app, chat::Chat, config::Config, feed::ChangeFeed, store::Store};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let store = Store::connect(&config.database_url, config.password_cost)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;

    // A failed bootstrap must not keep the server from coming up.
    match config.admin.as_ref() {
        Some(credentials) => match admin::ensure_admin(&store, credentials).await {
            Ok(outcome) => tracing::info!(?outcome, "admin bootstrap"),
            Err(e) => tracing::error!(error = %e, "admin bootstrap failed"),
        },
        None => tracing::warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set, skipping admin bootstrap"),
    }

    let chat = Chat::new(store, ChangeFeed::new(config.feed_capacity));
    let bind_addr = config.bind_addr;
    let app_state = AppState {
        chat,
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "listening");

    axum::serve(listener, app(app_state)).await?;
    Ok(())
}
