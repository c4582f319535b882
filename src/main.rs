//! SiteWatch Server - Main Entry Point
//!
//! Boots the detection stack and serves the HTTP/WebSocket API.

use sitewatch::state::{AppConfig, AppState};
use sitewatch::web_api;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitewatch=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting SiteWatch server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        host = %config.host,
        port = config.port,
        fire_model = config.fire_model_path.as_deref().unwrap_or("(unset)"),
        ppe_model = config.ppe_model_path.as_deref().unwrap_or("(unset)"),
        media_root = %config.media_root.display(),
        "Configuration loaded"
    );

    // Wire up services
    let state = AppState::build(config).await?;
    let health = state.detector.health();
    tracing::info!(
        fire_loaded = health.fire_loaded,
        ppe_loaded = health.ppe_loaded,
        alert_capacity = state.config.alert_log_capacity,
        "Services initialized"
    );

    // Create router; saved uploads are served back as static files
    let app = web_api::create_router(state.clone())
        .nest_service("/uploads", ServeDir::new(state.media.root()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
