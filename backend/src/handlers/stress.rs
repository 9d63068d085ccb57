//! HTTP handler for the crop stress index

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use shared::{parse_date, ApiResponse, StressIndex};
use validator::Validate;

use super::location;
use crate::error::AppResult;
use crate::AppState;

/// Query parameters for the stress index
#[derive(Debug, Deserialize, Validate)]
pub struct StressQuery {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: Option<f64>,
    /// Crop name overriding the catalogue, e.g. `Canola`
    pub crop_type: Option<String>,
    /// Assessment day, defaults to today
    pub date: Option<String>,
}

/// Stress score and grid for a field
pub async fn get_stress_index(
    State(state): State<AppState>,
    Path(field_id): Path<String>,
    Query(query): Query<StressQuery>,
) -> AppResult<Json<ApiResponse<StressIndex>>> {
    query.validate()?;
    let end = match query.date.as_deref() {
        Some(value) => parse_date(value)?,
        None => Utc::now().date_naive(),
    };

    let index = state
        .analytics
        .stress_index(
            &field_id,
            location(query.lat, query.lng),
            query.crop_type.as_deref(),
            end,
        )
        .await;
    Ok(Json(ApiResponse::success(index)))
}
