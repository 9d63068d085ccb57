//! HTTP handler for yield prediction

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{ApiResponse, YieldPoint};
use validator::Validate;

use super::SeriesQuery;
use crate::error::AppResult;
use crate::AppState;

/// Daily yield estimates (t/ha) with confidence
pub async fn get_yield_prediction(
    State(state): State<AppState>,
    Path(field_id): Path<String>,
    Query(query): Query<SeriesQuery>,
) -> AppResult<Json<ApiResponse<Vec<YieldPoint>>>> {
    query.validate()?;
    let range = query.range()?;
    let points = state.analytics.yield_prediction(&field_id, range).await;
    Ok(Json(ApiResponse::success(points)))
}
