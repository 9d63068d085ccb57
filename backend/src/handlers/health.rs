//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cache: String,
    pub sources: String,
}

/// Root endpoint
pub async fn root() -> &'static str {
    "Field Analytics Platform API v1.0"
}

/// Health check endpoint handler
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    // Check cache connectivity
    let cache_status = match state.cache.ping().await {
        Ok(()) => "connected".to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "Cache ping failed");
            "disconnected".to_string()
        }
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache: cache_status,
        sources: format!("{:?}", state.config.sources.mode).to_lowercase(),
    })
}
