//! nestboardd - the Nestboard forum service.
//!
//! Loads configuration, opens the database, and serves the JSON API (plus
//! `/metrics`) on a single listener.

use nestboard::config::Config;
use nestboard::db::Database;
use nestboard::http::{self, AppState};
use nestboard::metrics;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "nestboard.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        bind = %config.server.bind,
        db = %config.database.path,
        "Starting nestboard"
    );

    let db = Database::new(
        &config.database.path,
        Duration::from_millis(config.database.busy_timeout_ms),
    )
    .await?;

    metrics::init();

    let bind = config.server.bind;
    let state = Arc::new(AppState::new(db, config));
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %bind, "Listening");

    axum::serve(listener, app).await?;

    Ok(())
}
