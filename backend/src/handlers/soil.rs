//! HTTP handlers for soil moisture endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{ApiResponse, SoilMoisturePoint};
use validator::Validate;

use super::SeriesQuery;
use crate::error::AppResult;
use crate::services::precompute::{series_key, SOIL_KIND, SOIL_TTL_HOURS};
use crate::AppState;

/// Daily 0-7 cm soil moisture for a field
pub async fn get_soil_moisture(
    State(state): State<AppState>,
    Path(field_id): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> AppResult<Json<ApiResponse<Vec<SoilMoisturePoint>>>> {
    query.validate()?;
    let range = query.range()?;
    let location = query.location();
    let key = series_key(&field_id, location);

    if query.is_default_window() {
        if let Some(hit) = state
            .precompute
            .lookup::<Vec<SoilMoisturePoint>>(SOIL_KIND, &key)
            .await
        {
            return Ok(Json(ApiResponse::success_at(hit.data, hit.computed_at.to_rfc3339())));
        }
    }

    let points = state.analytics.soil_moisture(&field_id, location, range).await;
    if query.is_default_window() && !points.is_empty() {
        state
            .precompute
            .spawn_store(SOIL_KIND, key, points.clone(), SOIL_TTL_HOURS);
    }
    Ok(Json(ApiResponse::success(points)))
}
