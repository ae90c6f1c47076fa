use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use caption_server::{app, config::Config, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    info!(
        lightweight_caption = config.lightweight_caption,
        "starting caption server"
    );

    let state = Arc::new(AppState::new(config));
    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", state.config.bind_addr))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
