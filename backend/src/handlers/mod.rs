//! HTTP handlers
//!
//! Every payload is wrapped in [`shared::ApiResponse`]. Query parameters are
//! checked with `validator` before any work is done.

use chrono::{Duration, Utc};
use serde::Deserialize;
use shared::{parse_date, DateRange, LatLng};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::precompute::DEFAULT_WINDOW_DAYS;

mod carbon;
mod catalogue;
mod health;
mod kpi;
mod ndvi;
mod soil;
mod stress;
mod weather;
mod yield_prediction;

pub use carbon::get_carbon_metrics;
pub use catalogue::{get_crop, get_crop_metadata, get_farm, list_crops, list_farms, list_fields};
pub use health::{health_check, root};
pub use kpi::get_kpi_summary;
pub use ndvi::{get_ndvi_grid, get_ndvi_timeline};
pub use soil::get_soil_moisture;
pub use stress::get_stress_index;
pub use weather::get_weather;
pub use yield_prediction::get_yield_prediction;

/// Longest window a request may ask for, in days
pub const MAX_WINDOW_DAYS: usize = 366;

/// Optional location and date window shared by the series endpoints
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SeriesQuery {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: Option<f64>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
}

impl SeriesQuery {
    pub fn location(&self) -> Option<LatLng> {
        location(self.lat, self.lng)
    }

    pub fn range(&self) -> AppResult<DateRange> {
        resolve_range(self.date_start.as_deref(), self.date_end.as_deref())
    }

    /// No explicit dates: the window served from precomputed data
    pub fn is_default_window(&self) -> bool {
        self.date_start.is_none() && self.date_end.is_none()
    }
}

/// Coordinates count only when both are given
pub fn location(lat: Option<f64>, lng: Option<f64>) -> Option<LatLng> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)),
        _ => None,
    }
}

/// Parse an optional `YYYY-MM-DD` window. The end defaults to today and the
/// start to 30 days before the end; an end before the start or a window
/// longer than [`MAX_WINDOW_DAYS`] is rejected.
pub fn resolve_range(start: Option<&str>, end: Option<&str>) -> AppResult<DateRange> {
    let end = match end {
        Some(value) => parse_date(value)?,
        None => Utc::now().date_naive(),
    };
    let start = match start {
        Some(value) => parse_date(value)?,
        None => end - Duration::days(DEFAULT_WINDOW_DAYS),
    };
    let range = DateRange::new(start, end)?;
    if range.day_count() > MAX_WINDOW_DAYS {
        return Err(AppError::Validation {
            field: "date".to_string(),
            message: format!(
                "Requested window spans {} days, at most {} are allowed",
                range.day_count(),
                MAX_WINDOW_DAYS
            ),
        });
    }
    Ok(range)
}
