use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod common;
mod config;
mod docs;
mod infrastructure;
mod middleware;
mod modules;
mod routes;
mod state;
mod workers;

use config::settings::AppConfig;
use infrastructure::db::pool::connect_to_db;
use modules::media::repository::PgStatusStore;
use state::AppState;
use workers::encode_queue::EncodeQueue;
use workers::hls_encoder::FfmpegHlsEncoder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting server...");

    let config = AppConfig::new().context("Missing required environment variable")?;

    let pool = connect_to_db(&config.database_url).await?;
    let store = PgStatusStore::new(pool);
    store.init_schema().await?;

    tokio::fs::create_dir_all(config.videos_dir())
        .await
        .with_context(|| format!("Failed to create {}", config.videos_dir().display()))?;

    let shutdown = CancellationToken::new();
    let store = Arc::new(store);
    let encoder = Arc::new(FfmpegHlsEncoder::new(&config.ffmpeg_path, &config.ffprobe_path));
    let (encode_queue, driver) = EncodeQueue::start(
        store.clone(),
        encoder,
        config.failure_policy,
        shutdown.clone(),
    );

    let port = config.server_port;
    let state = AppState::new(config, store, encode_queue);
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Server running on http://0.0.0.0:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Waiting for the encode queue to stop...");
    shutdown.cancel();
    driver.await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
