use anyhow::Context;
use axum::middleware;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing_subscriber::EnvFilter;

use goldrate_hub::auth::{self, AccessKey};
use goldrate_hub::config::HubConfig;
use goldrate_hub::routes;
use goldrate_hub::schedule;
use goldrate_hub::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = HubConfig::from_env();
    let bind = cfg.bind.clone();
    let port = cfg.port;
    let key = cfg.key.clone();
    let static_dir = cfg.static_dir.clone();

    let state = Arc::new(AppState::build(cfg).context("failed to initialise state")?);

    // Scheduled refreshes at the configured local hours.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(schedule::run(Arc::clone(&state), shutdown_rx));

    // The shared key gates the API; the board shell itself is public so the
    // PWA can load and prompt for the key.
    let api = routes::api_router()
        .layer(middleware::from_fn(auth::require_key))
        .layer(axum::Extension(AccessKey(key)));

    let app = Router::new()
        .merge(api)
        .route("/health", axum::routing::get(health))
        .fallback_service(ServeDir::new(&static_dir).append_index_html_on_directories(true))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .context("invalid bind address")?;

    tracing::info!("goldrate hub listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("server error")?;
    Ok(())
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, gracefully stopping…");
    let _ = shutdown_tx.send(true);
}
