//! HTTP handler for carbon metrics

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{ApiResponse, CarbonPoint};
use validator::Validate;

use super::SeriesQuery;
use crate::error::AppResult;
use crate::AppState;

pub async fn get_carbon_metrics(
    State(state): State<AppState>,
    Path(field_id): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> AppResult<Json<ApiResponse<Vec<CarbonPoint>>>> {
    query.validate()?;
    let range = query.range()?;
    let points = state.analytics.carbon_metrics(&field_id, range).await;
    Ok(Json(ApiResponse::success(points)))
}
