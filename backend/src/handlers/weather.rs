//! HTTP handlers for weather endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{ApiResponse, TimeSeriesPoint};
use validator::Validate;

use super::SeriesQuery;
use crate::error::AppResult;
use crate::services::precompute::{series_key, WEATHER_KIND, WEATHER_TTL_HOURS};
use crate::AppState;

/// Daily mean temperature for a field
pub async fn get_weather(
    State(state): State<AppState>,
    Path(field_id): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> AppResult<Json<ApiResponse<Vec<TimeSeriesPoint>>>> {
    query.validate()?;
    let range = query.range()?;
    let location = query.location();
    let key = series_key(&field_id, location);

    if query.is_default_window() {
        if let Some(hit) = state
            .precompute
            .lookup::<Vec<TimeSeriesPoint>>(WEATHER_KIND, &key)
            .await
        {
            tracing::debug!(field_id = %field_id, "Serving precomputed weather");
            return Ok(Json(ApiResponse::success_at(hit.data, hit.computed_at.to_rfc3339())));
        }
    }

    let points = state.analytics.weather(&field_id, location, range).await;
    if query.is_default_window() && !points.is_empty() {
        state
            .precompute
            .spawn_store(WEATHER_KIND, key, points.clone(), WEATHER_TTL_HOURS);
    }
    Ok(Json(ApiResponse::success(points)))
}
