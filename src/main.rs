use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use caption_voice::api::{self, AppState};
use caption_voice::config::Config;
use caption_voice::model::CaptionModel;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    // The process must not accept traffic without a usable model, so a load
    // failure aborts before the listener binds.
    let model = tokio::task::spawn_blocking(CaptionModel::load)
        .await
        .context("model loader task panicked")??;

    let state = AppState {
        model: Arc::new(model),
        http: reqwest::Client::new(),
    };
    let app = api::router(state, &config.static_dir);

    if !config.static_dir.is_dir() {
        tracing::warn!(
            static_dir = %config.static_dir.display(),
            "static directory does not exist; only the API routes will resolve"
        );
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "caption-voice listening");

    axum::serve(listener, app).await?;
    Ok(())
}
