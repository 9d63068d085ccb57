//! HTTP handler for the headline KPI summary

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use shared::{ApiResponse, KpiSummary};
use validator::Validate;

use super::{location, resolve_range};
use crate::error::AppResult;
use crate::services::precompute::{kpi_key, KPI_KIND, KPI_TTL_HOURS};
use crate::services::KpiRequest;
use crate::AppState;

/// Query parameters for the KPI summary
#[derive(Debug, Deserialize, Validate)]
pub struct KpiQuery {
    pub farm_id: Option<String>,
    pub crop_id: Option<String>,
    pub field_id: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: Option<f64>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
}

/// Productivity, water efficiency and ESG indicators
pub async fn get_kpi_summary(
    State(state): State<AppState>,
    Query(query): Query<KpiQuery>,
) -> AppResult<Json<ApiResponse<KpiSummary>>> {
    query.validate()?;
    let range = resolve_range(query.date_start.as_deref(), query.date_end.as_deref())?;
    let default_window = query.date_start.is_none() && query.date_end.is_none();

    let request = KpiRequest {
        location: location(query.lat, query.lng),
        farm_id: query.farm_id,
        crop_id: query.crop_id,
        field_id: query.field_id,
    };
    let key = kpi_key(&request);

    if default_window {
        if let Some(hit) = state.precompute.lookup::<KpiSummary>(KPI_KIND, &key).await {
            tracing::debug!(key = %key, "Serving precomputed KPI summary");
            return Ok(Json(ApiResponse::success_at(hit.data, hit.computed_at.to_rfc3339())));
        }
    }

    let summary = state.analytics.kpi_summary(&request, range).await;
    if default_window {
        state
            .precompute
            .spawn_store(KPI_KIND, key, summary.clone(), KPI_TTL_HOURS);
    }
    Ok(Json(ApiResponse::success(summary)))
}
