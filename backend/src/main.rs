//! Field Analytics Platform - Backend Server

use std::net::SocketAddr;

use field_analytics_backend::{create_app, services::CacheStore, AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    // Initialize tracing; JSON lines in production
    let json_logs = config.environment == "production";
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "fa_server=debug,field_analytics_backend=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    tracing::info!("Starting Field Analytics Server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("Data sources: {:?}", config.sources.mode);

    // Open the response cache
    tracing::info!("Opening cache at {}", config.cache.database_url);
    let cache = CacheStore::connect(&config.cache.database_url, config.cache.ttl_hours).await?;
    match cache.cleanup_expired().await {
        Ok(removed) => tracing::info!("Removed {} expired cache entries", removed),
        Err(e) => tracing::warn!("Cache cleanup failed: {}", e),
    }

    // Create application state
    let state = AppState::new(config.clone(), cache);

    // Warm the default-window payloads without delaying startup
    let precompute = state.precompute.clone();
    tokio::spawn(async move { precompute.precompute_all_fields().await });

    // Build application
    let app = create_app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
