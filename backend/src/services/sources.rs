//! Data source orchestration
//!
//! Wraps the injected sources with the series cache and runs the per-request
//! fetches concurrently, each under its own deadline. A source that fails or
//! times out contributes an empty series instead of failing the request.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use shared::{DateRange, LatLng, Polygon, Raster, TimeSeriesPoint};

use super::cache::CacheStore;
use crate::config::{Config, SourceMode};
use crate::error::{AppError, AppResult};
use crate::external::{
    ClimateClient, CopernicusClient, CredentialCache, SoilMoistureSource, SyntheticSource,
    VegetationSource, WeatherSource,
};

/// Deadlines applied to each fetch
#[derive(Debug, Clone, Copy)]
pub struct SourceTimeouts {
    pub climate: Duration,
    pub vegetation: Duration,
}

impl Default for SourceTimeouts {
    fn default() -> Self {
        Self {
            climate: Duration::from_secs(30),
            vegetation: Duration::from_secs(10),
        }
    }
}

/// The set of signals one computation needs
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentRequest<'a> {
    pub location: LatLng,
    /// Window for weather, precipitation and soil moisture
    pub climate_range: DateRange,
    /// Field whose vegetation index is fetched; skipped when `None`
    pub vegetation: Option<(&'a str, &'a Polygon)>,
    pub vegetation_range: DateRange,
    pub include_precipitation: bool,
    pub include_soil: bool,
}

/// Series gathered for one computation; missing ones are empty
#[derive(Debug, Clone, Default)]
pub struct EnvironmentalSeries {
    pub weather: Vec<TimeSeriesPoint>,
    pub precipitation: Vec<TimeSeriesPoint>,
    pub soil: Vec<TimeSeriesPoint>,
    pub vegetation: Vec<TimeSeriesPoint>,
}

/// Injected sources plus the optional series cache
#[derive(Clone)]
pub struct DataSources {
    weather: Arc<dyn WeatherSource>,
    soil: Arc<dyn SoilMoistureSource>,
    vegetation: Arc<dyn VegetationSource>,
    cache: Option<CacheStore>,
    timeouts: SourceTimeouts,
}

impl DataSources {
    pub fn new(
        weather: Arc<dyn WeatherSource>,
        soil: Arc<dyn SoilMoistureSource>,
        vegetation: Arc<dyn VegetationSource>,
        timeouts: SourceTimeouts,
    ) -> Self {
        Self {
            weather,
            soil,
            vegetation,
            cache: None,
            timeouts,
        }
    }

    /// Every signal from one synthetic generator
    pub fn synthetic(source: SyntheticSource, timeouts: SourceTimeouts) -> Self {
        let source = Arc::new(source);
        Self::new(source.clone(), source.clone(), source, timeouts)
    }

    /// Sources selected by configuration. Live mode without Copernicus
    /// credentials keeps synthetic vegetation data.
    pub fn from_config(config: &Config) -> Self {
        let timeouts = SourceTimeouts {
            climate: Duration::from_secs(config.sources.weather_timeout_secs),
            vegetation: Duration::from_secs(config.sources.vegetation_timeout_secs),
        };
        let synthetic = match config.analytics.noise_seed {
            Some(seed) => SyntheticSource::seeded(seed),
            None => SyntheticSource::new(),
        };

        match config.sources.mode {
            SourceMode::Synthetic => Self::synthetic(synthetic, timeouts),
            SourceMode::Live => {
                let climate = Arc::new(ClimateClient::with_base_url(
                    config.climate.api_endpoint.clone(),
                ));
                let vegetation: Arc<dyn VegetationSource> =
                    match CopernicusClient::new(&config.copernicus, Arc::new(CredentialCache::new())) {
                        Ok(client) if config.copernicus.has_credentials() => Arc::new(client),
                        _ => {
                            tracing::warn!(
                                "Copernicus credentials missing, using synthetic vegetation data"
                            );
                            Arc::new(synthetic)
                        }
                    };
                Self::new(climate.clone(), climate, vegetation, timeouts)
            }
        }
    }

    pub fn with_cache(mut self, cache: CacheStore) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn timeouts(&self) -> SourceTimeouts {
        self.timeouts
    }

    pub async fn weather(&self, location: LatLng, range: DateRange) -> AppResult<Vec<TimeSeriesPoint>> {
        let key = location_key(location, range);
        self.cached("weather", &key, self.weather.fetch_weather(location, range))
            .await
    }

    pub async fn precipitation(
        &self,
        location: LatLng,
        range: DateRange,
    ) -> AppResult<Vec<TimeSeriesPoint>> {
        let key = location_key(location, range);
        self.cached("precipitation", &key, self.weather.fetch_precipitation(location, range))
            .await
    }

    pub async fn soil_moisture(
        &self,
        location: LatLng,
        range: DateRange,
    ) -> AppResult<Vec<TimeSeriesPoint>> {
        let key = location_key(location, range);
        self.cached("soil_moisture", &key, self.soil.fetch_soil_moisture(location, range))
            .await
    }

    pub async fn vegetation_timeline(
        &self,
        field_id: &str,
        polygon: &Polygon,
        range: DateRange,
    ) -> AppResult<Vec<TimeSeriesPoint>> {
        let key = format!("{}_{}_{}", field_id, range.start, range.end);
        self.cached(
            "vegetation",
            &key,
            self.vegetation
                .fetch_vegetation_timeline(field_id, polygon, range),
        )
        .await
    }

    pub async fn vegetation_raster(
        &self,
        field_id: &str,
        polygon: &Polygon,
        range: DateRange,
    ) -> AppResult<Raster> {
        with_deadline(
            "vegetation raster",
            self.timeouts.vegetation,
            self.vegetation.fetch_vegetation_raster(field_id, polygon, range),
        )
        .await
    }

    /// Fetch everything `request` asks for concurrently. Never fails.
    pub async fn fetch_environment(&self, request: EnvironmentRequest<'_>) -> EnvironmentalSeries {
        let climate = self.timeouts.climate;
        let location = request.location;
        let range = request.climate_range;

        let weather = degrade("weather", climate, self.weather(location, range));
        let precipitation = async {
            if request.include_precipitation {
                degrade("precipitation", climate, self.precipitation(location, range)).await
            } else {
                Vec::new()
            }
        };
        let soil = async {
            if request.include_soil {
                degrade("soil moisture", climate, self.soil_moisture(location, range)).await
            } else {
                Vec::new()
            }
        };
        let vegetation = async {
            match request.vegetation {
                Some((field_id, polygon)) => {
                    degrade(
                        "vegetation",
                        self.timeouts.vegetation,
                        self.vegetation_timeline(field_id, polygon, request.vegetation_range),
                    )
                    .await
                }
                None => Vec::new(),
            }
        };

        let (weather, precipitation, soil, vegetation) =
            tokio::join!(weather, precipitation, soil, vegetation);

        EnvironmentalSeries {
            weather,
            precipitation,
            soil,
            vegetation,
        }
    }

    /// Serve from the series cache, or fetch and store non-empty results.
    /// Cache failures are logged and otherwise ignored.
    async fn cached<F>(&self, kind: &str, key: &str, fetch: F) -> AppResult<Vec<TimeSeriesPoint>>
    where
        F: Future<Output = AppResult<Vec<TimeSeriesPoint>>>,
    {
        let Some(cache) = &self.cache else {
            return fetch.await;
        };

        match cache.get_series(kind, key).await {
            Ok(Some(points)) => {
                tracing::debug!(kind, key, "Series cache hit");
                return Ok(points);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(kind, error = %e, "Series cache read failed"),
        }

        let points = fetch.await?;
        if !points.is_empty() {
            if let Err(e) = cache.put_series(kind, key, &points).await {
                tracing::warn!(kind, error = %e, "Series cache write failed");
            }
        }
        Ok(points)
    }
}

fn location_key(location: LatLng, range: DateRange) -> String {
    format!("{:.4}_{:.4}_{}_{}", location.lat, location.lng, range.start, range.end)
}

/// Run `fetch` under `limit`, mapping an elapsed deadline to an error
pub async fn with_deadline<T, F>(label: &str, limit: Duration, fetch: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    tokio::time::timeout(limit, fetch)
        .await
        .map_err(|_| AppError::Timeout(label.to_string()))?
}

/// Run `fetch` under `limit`; failures and timeouts become an empty series
pub async fn degrade<F>(label: &str, limit: Duration, fetch: F) -> Vec<TimeSeriesPoint>
where
    F: Future<Output = AppResult<Vec<TimeSeriesPoint>>>,
{
    match with_deadline(label, limit, fetch).await {
        Ok(points) => points,
        Err(e) => {
            tracing::warn!(source = label, error = %e, "Data source unavailable, continuing without it");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use shared::analytics::geometry::FARM_1_ANCHOR;
    use shared::analytics::synthesize_fallback_polygon;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SlowWeather;

    #[async_trait]
    impl WeatherSource for SlowWeather {
        async fn fetch_weather(&self, _: LatLng, _: DateRange) -> AppResult<Vec<TimeSeriesPoint>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![TimeSeriesPoint::new("2024-06-01T00:00:00", 20.0)])
        }
    }

    struct BrokenVegetation;

    #[async_trait]
    impl VegetationSource for BrokenVegetation {
        async fn fetch_vegetation_timeline(
            &self,
            _: &str,
            _: &Polygon,
            _: DateRange,
        ) -> AppResult<Vec<TimeSeriesPoint>> {
            Err(AppError::ExternalService("satellite offline".to_string()))
        }
    }

    #[derive(Default)]
    struct CountingSoil {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SoilMoistureSource for CountingSoil {
        async fn fetch_soil_moisture(&self, _: LatLng, range: DateRange) -> AppResult<Vec<TimeSeriesPoint>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(range.days().map(|d| TimeSeriesPoint::daily(d, 40.0)).collect())
        }
    }

    fn range() -> DateRange {
        DateRange::trailing(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(), 7)
    }

    fn short_timeouts() -> SourceTimeouts {
        SourceTimeouts {
            climate: Duration::from_millis(50),
            vegetation: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn test_slow_and_broken_sources_degrade_to_empty() {
        let soil = Arc::new(CountingSoil::default());
        let sources = DataSources::new(
            Arc::new(SlowWeather),
            soil.clone(),
            Arc::new(BrokenVegetation),
            short_timeouts(),
        );
        let polygon = synthesize_fallback_polygon(FARM_1_ANCHOR, 0.005);

        let series = sources
            .fetch_environment(EnvironmentRequest {
                location: FARM_1_ANCHOR,
                climate_range: range(),
                vegetation: Some(("field-1", &polygon)),
                vegetation_range: range(),
                include_precipitation: true,
                include_soil: true,
            })
            .await;

        assert!(series.weather.is_empty());
        assert!(series.precipitation.is_empty());
        assert!(series.vegetation.is_empty());
        assert_eq!(series.soil.len(), 8);
    }

    #[tokio::test]
    async fn test_skipped_sources_are_not_called() {
        let soil = Arc::new(CountingSoil::default());
        let synthetic = Arc::new(SyntheticSource::seeded(1));
        let sources = DataSources::new(synthetic.clone(), soil.clone(), synthetic, short_timeouts());

        let series = sources
            .fetch_environment(EnvironmentRequest {
                location: FARM_1_ANCHOR,
                climate_range: range(),
                vegetation: None,
                vegetation_range: range(),
                include_precipitation: false,
                include_soil: false,
            })
            .await;

        assert_eq!(series.weather.len(), 8);
        assert!(series.soil.is_empty() && series.vegetation.is_empty());
        assert_eq!(soil.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_series_cache_avoids_second_fetch() {
        let soil = Arc::new(CountingSoil::default());
        let synthetic = Arc::new(SyntheticSource::seeded(1));
        let cache = CacheStore::in_memory(24).await.unwrap();
        let sources = DataSources::new(synthetic.clone(), soil.clone(), synthetic, short_timeouts())
            .with_cache(cache);

        let first = sources.soil_moisture(FARM_1_ANCHOR, range()).await.unwrap();
        let second = sources.soil_moisture(FARM_1_ANCHOR, range()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(soil.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_default_raster_is_unsupported() {
        let sources = DataSources::new(
            Arc::new(SyntheticSource::seeded(1)),
            Arc::new(CountingSoil::default()),
            Arc::new(BrokenVegetation),
            short_timeouts(),
        );
        let polygon = synthesize_fallback_polygon(FARM_1_ANCHOR, 0.005);
        let result = sources.vegetation_raster("field-1", &polygon, range()).await;
        assert!(matches!(result, Err(AppError::ExternalService(_))));
    }
}
