//! Route definitions for the Field Analytics Platform

use axum::{routing::get, Router};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Catalogue
        .route("/farms", get(handlers::list_farms))
        .route("/farms/:farm_id", get(handlers::get_farm))
        .route("/crops", get(handlers::list_crops))
        .route("/crops/:crop_id", get(handlers::get_crop))
        .route("/crops/:crop_id/metadata", get(handlers::get_crop_metadata))
        .route("/fields", get(handlers::list_fields))
        // Vegetation index
        .nest("/ndvi", ndvi_routes())
        // Environmental series
        .route("/weather/:field_id", get(handlers::get_weather))
        .route("/soil-moisture/:field_id", get(handlers::get_soil_moisture))
        // Derived analytics
        .route("/stress/:field_id", get(handlers::get_stress_index))
        .route("/kpi", get(handlers::get_kpi_summary))
        .route("/yield-prediction/:field_id", get(handlers::get_yield_prediction))
        .route("/carbon-metrics/:field_id", get(handlers::get_carbon_metrics))
}

/// Vegetation index routes
fn ndvi_routes() -> Router<AppState> {
    Router::new()
        .route("/:field_id/timeline", get(handlers::get_ndvi_timeline))
        .route("/:field_id/grid", get(handlers::get_ndvi_grid))
}
