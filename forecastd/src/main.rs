//! forecastd - HTTP forecasting service
//!
//! Every request gets a fresh brain; nothing is persisted between requests.
//!
//! Config locations (`config.json`, optional):
//! - Linux: ~/.config/forecastd/
//! - Windows: %APPDATA%\forecastd\
//! - MacOS: ~/Library/Application Support/forecastd/
//!
//! `FORECASTD_ADDR` and `FORECASTD_LOG` override the file.

use tracing::info;

mod api;
mod config;
mod paths;

use api::ApiState;
use config::DaemonConfig;
use paths::AppPaths;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let paths = AppPaths::new()?;
    let cfg = DaemonConfig::load(&paths.config_file())?.with_env_overrides();

    tracing_subscriber::fmt()
        .with_max_level(cfg.tracing_level().unwrap_or(tracing::Level::INFO))
        .init();
    cfg.log_summary();

    let app = api::router(ApiState::new(cfg.forecast.clone(), cfg.max_series_len));
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    Ok(())
}
