//! HTTP handlers for vegetation index endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{ApiResponse, NdviGrid, TimeSeriesPoint};
use validator::Validate;

use super::SeriesQuery;
use crate::error::AppResult;
use crate::AppState;

/// Daily vegetation index readings for a field
pub async fn get_ndvi_timeline(
    State(state): State<AppState>,
    Path(field_id): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> AppResult<Json<ApiResponse<Vec<TimeSeriesPoint>>>> {
    query.validate()?;
    let range = query.range()?;
    let timeline = state.analytics.ndvi_timeline(&field_id, range).await?;
    Ok(Json(ApiResponse::success(timeline)))
}

/// Vegetation index grid for a field
pub async fn get_ndvi_grid(
    State(state): State<AppState>,
    Path(field_id): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> AppResult<Json<ApiResponse<NdviGrid>>> {
    query.validate()?;
    let range = query.range()?;
    let grid = state.analytics.ndvi_grid(&field_id, range).await?;
    Ok(Json(ApiResponse::success(grid)))
}
