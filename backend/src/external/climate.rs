//! Climate reanalysis client for historical weather and soil moisture
//!
//! Integrates with the ERA5 archive API (Open-Meteo compatible JSON):
//! daily mean temperature and precipitation, and hourly 0-7 cm soil
//! moisture averaged per day.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shared::analytics::round_to;
use shared::{DateRange, LatLng, TimeSeriesPoint};

use super::{SoilMoistureSource, WeatherSource};
use crate::error::{AppError, AppResult};

const DAILY_TEMPERATURE: &str = "temperature_2m_mean";
const DAILY_PRECIPITATION: &str = "precipitation_sum";
const HOURLY_SOIL_MOISTURE: &str = "soil_moisture_0_to_7cm";

/// Climate reanalysis API client
#[derive(Clone)]
pub struct ClimateClient {
    client: Client,
    base_url: String,
}

/// Archive API response; `daily` or `hourly` depending on the request
#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    daily: Option<ArchiveBlock>,
    hourly: Option<ArchiveBlock>,
}

/// Column-oriented block: one `time` column plus one column per variable
#[derive(Debug, Deserialize)]
struct ArchiveBlock {
    time: Vec<String>,
    #[serde(flatten)]
    columns: HashMap<String, Vec<Option<f64>>>,
}

impl ArchiveBlock {
    fn column(&self, variable: &str) -> AppResult<&[Option<f64>]> {
        self.columns
            .get(variable)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                AppError::ExternalService(format!("Climate API response lacks '{}'", variable))
            })
    }
}

impl ClimateClient {
    /// Create a new ClimateClient against the public archive
    pub fn new() -> Self {
        Self::with_base_url(crate::config::DEFAULT_CLIMATE_ENDPOINT.to_string())
    }

    /// Create a new ClimateClient with custom base URL (for testing)
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_archive(
        &self,
        location: LatLng,
        range: DateRange,
        resolution: &str,
        variable: &str,
    ) -> AppResult<ArchiveBlock> {
        let url = format!(
            "{}/archive?latitude={}&longitude={}&start_date={}&end_date={}&{}={}&timezone=UTC",
            self.base_url, location.lat, location.lng, range.start, range.end, resolution, variable
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Climate API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Climate API error: {} - {}",
                status, body
            )));
        }

        let data: ArchiveResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("Failed to parse climate response: {}", e))
        })?;

        let block = if resolution == "daily" {
            data.daily
        } else {
            data.hourly
        };
        block.ok_or_else(|| {
            AppError::ExternalService(format!("Climate API returned no {} block", resolution))
        })
    }

    async fn fetch_daily(
        &self,
        location: LatLng,
        range: DateRange,
        variable: &str,
    ) -> AppResult<Vec<TimeSeriesPoint>> {
        let block = self.fetch_archive(location, range, "daily", variable).await?;
        Ok(daily_points(&block.time, block.column(variable)?))
    }
}

impl Default for ClimateClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Pair days with values, skipping gaps
fn daily_points(days: &[String], values: &[Option<f64>]) -> Vec<TimeSeriesPoint> {
    days.iter()
        .zip(values)
        .filter_map(|(day, value)| {
            value.map(|v| TimeSeriesPoint::new(format!("{}T00:00:00", day), round_to(v, 2)))
        })
        .collect()
}

/// Average hourly volumetric fractions per day and convert to percent
fn hourly_to_daily_percent(times: &[String], values: &[Option<f64>]) -> Vec<TimeSeriesPoint> {
    let mut by_day: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for (time, value) in times.iter().zip(values) {
        let (Some(day), Some(value)) = (time.get(..10), value) else {
            continue;
        };
        let entry = by_day.entry(day).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    by_day
        .into_iter()
        .map(|(day, (sum, count))| {
            TimeSeriesPoint::new(
                format!("{}T00:00:00", day),
                round_to(sum / count as f64 * 100.0, 2),
            )
        })
        .collect()
}

#[async_trait]
impl WeatherSource for ClimateClient {
    async fn fetch_weather(
        &self,
        location: LatLng,
        range: DateRange,
    ) -> AppResult<Vec<TimeSeriesPoint>> {
        self.fetch_daily(location, range, DAILY_TEMPERATURE).await
    }

    async fn fetch_precipitation(
        &self,
        location: LatLng,
        range: DateRange,
    ) -> AppResult<Vec<TimeSeriesPoint>> {
        self.fetch_daily(location, range, DAILY_PRECIPITATION).await
    }
}

#[async_trait]
impl SoilMoistureSource for ClimateClient {
    async fn fetch_soil_moisture(
        &self,
        location: LatLng,
        range: DateRange,
    ) -> AppResult<Vec<TimeSeriesPoint>> {
        let block = self
            .fetch_archive(location, range, "hourly", HOURLY_SOIL_MOISTURE)
            .await?;
        Ok(hourly_to_daily_percent(
            &block.time,
            block.column(HOURLY_SOIL_MOISTURE)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_block_parses() {
        let json = r#"{
            "latitude": 52.6,
            "daily": {
                "time": ["2024-06-01", "2024-06-02", "2024-06-03"],
                "temperature_2m_mean": [14.234, null, 16.0]
            }
        }"#;
        let response: ArchiveResponse = serde_json::from_str(json).unwrap();
        let block = response.daily.unwrap();
        let points = daily_points(&block.time, block.column(DAILY_TEMPERATURE).unwrap());

        assert_eq!(points.len(), 2);
        assert_eq!(points[0], TimeSeriesPoint::new("2024-06-01T00:00:00", 14.23));
        assert_eq!(points[1].timestamp, "2024-06-03T00:00:00");
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let block = ArchiveBlock {
            time: vec!["2024-06-01".to_string()],
            columns: HashMap::new(),
        };
        assert!(block.column(DAILY_PRECIPITATION).is_err());
    }

    #[test]
    fn test_hourly_soil_moisture_is_averaged_per_day() {
        let times = vec![
            "2024-06-01T00:00".to_string(),
            "2024-06-01T01:00".to_string(),
            "2024-06-02T00:00".to_string(),
        ];
        let values = vec![Some(0.30), Some(0.40), Some(0.25)];
        let points = hourly_to_daily_percent(&times, &values);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0], TimeSeriesPoint::new("2024-06-01T00:00:00", 35.0));
        assert_eq!(points[1].value, 25.0);
    }
}
