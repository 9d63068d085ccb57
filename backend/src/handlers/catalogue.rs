//! HTTP handlers for farms, crops and field boundaries

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::{ApiResponse, Crop, CropMetadata, Farm, FieldBoundary};

use crate::error::{AppError, AppResult};
use crate::AppState;

/// List all farms
pub async fn list_farms(State(state): State<AppState>) -> Json<ApiResponse<Vec<Farm>>> {
    Json(ApiResponse::success(state.catalogue.farms().to_vec()))
}

/// Get a farm by ID
pub async fn get_farm(
    State(state): State<AppState>,
    Path(farm_id): Path<String>,
) -> AppResult<Json<ApiResponse<Farm>>> {
    let farm = state
        .catalogue
        .farm(&farm_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Farm {}", farm_id)))?;
    Ok(Json(ApiResponse::success(farm)))
}

/// List all crops
pub async fn list_crops(State(state): State<AppState>) -> Json<ApiResponse<Vec<Crop>>> {
    Json(ApiResponse::success(state.catalogue.crops().to_vec()))
}

/// Get a crop by ID
pub async fn get_crop(
    State(state): State<AppState>,
    Path(crop_id): Path<String>,
) -> AppResult<Json<ApiResponse<Crop>>> {
    let crop = state
        .catalogue
        .crop(&crop_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Crop {}", crop_id)))?;
    Ok(Json(ApiResponse::success(crop)))
}

#[derive(Debug, Deserialize)]
pub struct CropMetadataQuery {
    pub crop_name: Option<String>,
}

/// Reference metadata for a crop; lookup failures are reported in the payload
pub async fn get_crop_metadata(
    State(state): State<AppState>,
    Path(crop_id): Path<String>,
    Query(query): Query<CropMetadataQuery>,
) -> Json<ApiResponse<CropMetadata>> {
    let metadata = state
        .crop_metadata
        .crop_metadata(&crop_id, query.crop_name.as_deref())
        .await;
    Json(ApiResponse::success(metadata))
}

/// Query parameters for field listing
#[derive(Debug, Deserialize)]
pub struct FieldsQuery {
    pub farm_id: Option<String>,
    pub crop_id: Option<String>,
}

/// List field boundaries, optionally filtered by farm and crop
pub async fn list_fields(
    State(state): State<AppState>,
    Query(query): Query<FieldsQuery>,
) -> Json<ApiResponse<Vec<FieldBoundary>>> {
    let fields = state
        .catalogue
        .fields(query.farm_id.as_deref(), query.crop_id.as_deref());
    Json(ApiResponse::success(fields))
}
