//! Field Analytics Platform - Backend
//!
//! Serves vegetation, weather and soil series for farm fields together with
//! the derived analytics: crop stress, headline KPIs, yield and carbon.

use std::sync::Arc;

use axum::{http::HeaderValue, routing::get, Router};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod routes;
pub mod services;

pub use config::Config;

use external::CropReferenceSource;
use services::{
    AnalyticsService, CacheStore, CropMetadataService, DataSources, FieldCatalogue,
    PrecomputeService,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalogue: Arc<FieldCatalogue>,
    pub analytics: AnalyticsService,
    pub precompute: PrecomputeService,
    pub crop_metadata: CropMetadataService,
    pub cache: CacheStore,
}

impl AppState {
    /// State with the sources selected by `config`
    pub fn new(config: Config, cache: CacheStore) -> Self {
        let sources = DataSources::from_config(&config);
        Self::with_sources(config, cache, sources)
    }

    /// State with explicitly injected sources
    pub fn with_sources(config: Config, cache: CacheStore, sources: DataSources) -> Self {
        let catalogue = Arc::new(FieldCatalogue::reference());
        let analytics = AnalyticsService::new(
            sources.with_cache(cache.clone()),
            catalogue.clone(),
            config.analytics.clone(),
        );
        let precompute = PrecomputeService::new(analytics.clone(), cache.clone());
        let crop_metadata = CropMetadataService::from_config(&config, catalogue.clone());

        Self {
            config: Arc::new(config),
            catalogue,
            analytics,
            precompute,
            crop_metadata,
            cache,
        }
    }

    /// Replace the crop reference used for metadata lookups
    pub fn with_crop_reference(mut self, source: Arc<dyn CropReferenceSource>) -> Self {
        self.crop_metadata = CropMetadataService::new(source, self.catalogue.clone());
        self
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `*` allows any origin; unparsable origins are skipped
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
