use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use flight_delay::{api, config::ServiceConfig, DelayPredictor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ServiceConfig::from_env().context("failed to read service configuration")?;
    if let Some(remote) = cfg.remote_artifact() {
        tracing::info!(remote = %remote, local = %cfg.local_model_path.display(), "model artifact source");
    }

    let predictor = Arc::new(DelayPredictor::new());
    // A missing artifact is not fatal: /predict retries on first use and
    // answers 503 until the file shows up.
    match predictor.load_path(&cfg.local_model_path) {
        Ok(()) => {
            let cols = predictor.known_columns()?;
            tracing::info!("loaded model; feature_columns[{}]: {:?}", cols.len(), cols);
        }
        Err(e) => tracing::warn!(error = %e, "model not available at startup"),
    }

    let state = api::AppState::new(predictor, cfg.local_model_path.clone());
    let app = api::router(state);

    let addr = cfg.socket_addr()?;
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
