use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dubbing_backend::app;
use dubbing_backend::config::settings::AppConfig;
use dubbing_backend::infrastructure::db::pool::{connect_to_db, run_migrations};
use dubbing_backend::infrastructure::dubbing::elevenlabs::ElevenLabsClient;
use dubbing_backend::infrastructure::media::ffmpeg::Ffmpeg;
use dubbing_backend::infrastructure::storage::s3::StorageService;
use dubbing_backend::modules::dubbing::repository::PgJobRepository;
use dubbing_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dubbing_backend=debug,tower_http=info")),
        )
        .init();

    info!("Starting server...");

    let config = AppConfig::new().context("invalid configuration")?;

    let db = connect_to_db(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;
    run_migrations(&db).await.context("failed to apply migrations")?;

    let provider = ElevenLabsClient::new(&config.provider).context("failed to build provider client")?;
    let storage = StorageService::new(&config.storage);
    let ffmpeg = Ffmpeg::new(&config.media.ffmpeg_path);

    let state = AppState::new(
        Arc::new(PgJobRepository::new(db)),
        Arc::new(provider),
        Arc::new(storage),
        Arc::new(ffmpeg),
    )
    .with_thumbnails(config.media.thumbnails_enabled)
    .with_job_config(config.jobs.clone())
    .with_upload_dir(config.upload_dir.clone())
    .with_max_upload_bytes(config.max_upload_bytes);

    let app = app::create_app(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
