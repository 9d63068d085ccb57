//! Offline data source producing plausible seasonal signals
//!
//! Used in development, in tests and as the raster fallback when a live
//! vegetation source cannot provide imagery.

use std::f64::consts::PI;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::analytics::{contains_point, resolve_bounds, round_to};
use shared::{CropItem, DateRange, LatLng, Polygon, Raster, TimeSeriesPoint};

use super::{CropReferenceSource, SoilMoistureSource, VegetationSource, WeatherSource};
use crate::error::{AppError, AppResult};

/// Ground size of a synthetic raster cell in metres
pub const RASTER_RESOLUTION_M: f64 = 10.0;
const METRES_PER_DEGREE: f64 = 111_320.0;
const MAX_RASTER_EDGE: usize = 2048;

/// Seasonal generator for every signal the analytics consume
#[derive(Debug, Clone, Default)]
pub struct SyntheticSource {
    seed: Option<u64>,
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self { seed: None }
    }

    /// Deterministic generator; identical requests yield identical data
    pub fn seeded(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    fn rng(&self, salt: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ salt),
            None => StdRng::from_entropy(),
        }
    }

    /// Raster over the polygon bounds at 10 m resolution, masked outside the
    /// polygon
    pub fn vegetation_raster(&self, field_id: &str, polygon: &Polygon) -> Raster {
        let mut rng = self.rng(salt_for(field_id, 3));
        let bounds = resolve_bounds(polygon);

        let centre_lat = (bounds.north + bounds.south) / 2.0;
        let cell_lat = RASTER_RESOLUTION_M / METRES_PER_DEGREE;
        let cell_lng = RASTER_RESOLUTION_M / (METRES_PER_DEGREE * centre_lat.to_radians().cos().max(0.01));

        let rows = cells_along(bounds.height(), cell_lat);
        let cols = cells_along(bounds.width(), cell_lng);
        // Cells tile the bounds exactly
        let row_step = bounds.height() / rows as f64;
        let col_step = bounds.width() / cols as f64;

        let values = (0..rows)
            .map(|row| {
                let lat = bounds.north - (row as f64 + 0.5) * row_step;
                (0..cols)
                    .map(|col| {
                        let lng = bounds.west + (col as f64 + 0.5) * col_step;
                        if contains_point(polygon, lat, lng) {
                            round_to(0.2 + rng.gen_range(0.0..0.7), 3)
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect();

        Raster {
            resolution: RASTER_RESOLUTION_M,
            bounds,
            values,
        }
    }
}

fn cells_along(extent_deg: f64, cell_deg: f64) -> usize {
    ((extent_deg / cell_deg).ceil() as usize).clamp(1, MAX_RASTER_EDGE)
}

/// Mix the request into the seed so different fields and windows differ
fn salt_for(key: &str, kind: u64) -> u64 {
    key.bytes()
        .fold(kind.wrapping_mul(0x9E37_79B9_7F4A_7C15), |acc, b| {
            acc.rotate_left(5) ^ u64::from(b)
        })
}

fn location_salt(location: LatLng, range: DateRange, kind: u64) -> u64 {
    salt_for(
        &format!(
            "{:.4}:{:.4}:{}:{}",
            location.lat, location.lng, range.start, range.end
        ),
        kind,
    )
}

fn day_of_year(day: NaiveDate) -> f64 {
    f64::from(day.ordinal())
}

/// Mean daily temperature for a mid-latitude continental climate, °C
fn seasonal_temperature(day: NaiveDate) -> f64 {
    3.0 + 15.0 * (2.0 * PI * (day_of_year(day) - 105.0) / 365.0).sin()
}

/// Vegetation index following a May to September growing season
fn seasonal_vegetation(day: NaiveDate) -> f64 {
    0.35 + 0.4 * (PI * (day_of_year(day) - 120.0) / 150.0).sin().max(0.0)
}

#[async_trait]
impl WeatherSource for SyntheticSource {
    async fn fetch_weather(
        &self,
        location: LatLng,
        range: DateRange,
    ) -> AppResult<Vec<TimeSeriesPoint>> {
        let mut rng = self.rng(location_salt(location, range, 1));
        Ok(range
            .days()
            .map(|day| {
                let temp = seasonal_temperature(day) + rng.gen_range(-5.0..5.0);
                TimeSeriesPoint::daily(day, round_to(temp, 2))
            })
            .collect())
    }

    async fn fetch_precipitation(
        &self,
        location: LatLng,
        range: DateRange,
    ) -> AppResult<Vec<TimeSeriesPoint>> {
        let mut rng = self.rng(location_salt(location, range, 2));
        Ok(range
            .days()
            .map(|day| {
                let rain = if rng.gen_bool(0.55) {
                    0.0
                } else {
                    round_to(rng.gen_range(0.5..12.0), 1)
                };
                TimeSeriesPoint::daily(day, rain)
            })
            .collect())
    }
}

#[async_trait]
impl SoilMoistureSource for SyntheticSource {
    async fn fetch_soil_moisture(
        &self,
        location: LatLng,
        range: DateRange,
    ) -> AppResult<Vec<TimeSeriesPoint>> {
        let mut rng = self.rng(location_salt(location, range, 4));
        Ok(range
            .days()
            .map(|day| TimeSeriesPoint::daily(day, round_to(50.0 + rng.gen_range(0.0..20.0), 2)))
            .collect())
    }
}

#[async_trait]
impl VegetationSource for SyntheticSource {
    async fn fetch_vegetation_timeline(
        &self,
        field_id: &str,
        _polygon: &Polygon,
        range: DateRange,
    ) -> AppResult<Vec<TimeSeriesPoint>> {
        let mut rng = self.rng(salt_for(&format!("{}:{}:{}", field_id, range.start, range.end), 5));
        Ok(range
            .days()
            .map(|day| {
                let index = (seasonal_vegetation(day) + rng.gen_range(-0.05..0.05)).clamp(0.0, 1.0);
                TimeSeriesPoint::new(
                    format!("{}T12:00:00Z", day.format("%Y-%m-%d")),
                    round_to(index, 3),
                )
            })
            .collect())
    }

    async fn fetch_vegetation_raster(
        &self,
        field_id: &str,
        polygon: &Polygon,
        _range: DateRange,
    ) -> AppResult<Raster> {
        Ok(self.vegetation_raster(field_id, polygon))
    }
}

/// No offline crop reference exists; lookups report the gap
#[async_trait]
impl CropReferenceSource for SyntheticSource {
    fn name(&self) -> &'static str {
        "FAO"
    }

    async fn fetch_crop_items(&self) -> AppResult<Vec<CropItem>> {
        Err(AppError::ExternalService(
            "crop reference lookups need live sources".to_string(),
        ))
    }
}
