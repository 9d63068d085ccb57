//! Background precomputation of default-window payloads
//!
//! KPI, weather and soil moisture responses for the default 30-day window are
//! computed ahead of time and stored in the `precomputed` cache table.
//! Handlers serve those rows while they are fresh.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::{DateRange, LatLng, SoilMoisturePoint, TimeSeriesPoint};

use super::analytics::{AnalyticsService, KpiRequest};
use super::cache::{CacheStore, Precomputed};
use crate::error::AppResult;

/// Default window served from precomputed data, days
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

pub const KPI_KIND: &str = "kpi";
pub const WEATHER_KIND: &str = "weather";
pub const SOIL_KIND: &str = "soil_moisture";

pub const KPI_TTL_HOURS: i64 = 24;
pub const WEATHER_TTL_HOURS: i64 = 6;
pub const SOIL_TTL_HOURS: i64 = 12;

/// Cache key of a KPI request; absent filters are written as `all`
pub fn kpi_key(request: &KpiRequest) -> String {
    let part = |value: &Option<String>| value.clone().unwrap_or_else(|| "all".to_string());
    let location = request
        .location
        .map(|l| format!("{:.4},{:.4}", l.lat, l.lng))
        .unwrap_or_else(|| "auto".to_string());
    format!(
        "{}|{}|{}|{}",
        part(&request.farm_id),
        part(&request.crop_id),
        part(&request.field_id),
        location
    )
}

/// Cache key of a per-field series request
pub fn series_key(field_id: &str, location: Option<LatLng>) -> String {
    match location {
        Some(l) => format!("{}|{:.4},{:.4}", field_id, l.lat, l.lng),
        None => field_id.to_string(),
    }
}

/// Writes and reads precomputed payloads
#[derive(Clone)]
pub struct PrecomputeService {
    analytics: AnalyticsService,
    cache: CacheStore,
}

impl PrecomputeService {
    pub fn new(analytics: AnalyticsService, cache: CacheStore) -> Self {
        Self { analytics, cache }
    }

    fn default_window() -> DateRange {
        DateRange::last_days(DEFAULT_WINDOW_DAYS)
    }

    /// Fresh precomputed payload, if any. Cache errors count as a miss.
    pub async fn lookup<T: DeserializeOwned>(&self, kind: &str, key: &str) -> Option<Precomputed<T>> {
        match self.cache.get_precomputed(kind, key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(kind, key, error = %e, "Precomputed lookup failed");
                None
            }
        }
    }

    pub async fn precompute_kpi(&self, request: &KpiRequest) -> AppResult<()> {
        let summary = self
            .analytics
            .kpi_summary(request, Self::default_window())
            .await;
        self.cache
            .put_precomputed(KPI_KIND, &kpi_key(request), &summary, KPI_TTL_HOURS)
            .await
    }

    pub async fn precompute_weather(&self, field_id: &str, location: Option<LatLng>) -> AppResult<()> {
        let points: Vec<TimeSeriesPoint> = self
            .analytics
            .weather(field_id, location, Self::default_window())
            .await;
        self.store_series(WEATHER_KIND, &series_key(field_id, location), &points, WEATHER_TTL_HOURS)
            .await
    }

    pub async fn precompute_soil(&self, field_id: &str, location: Option<LatLng>) -> AppResult<()> {
        let points: Vec<SoilMoisturePoint> = self
            .analytics
            .soil_moisture(field_id, location, Self::default_window())
            .await;
        self.store_series(SOIL_KIND, &series_key(field_id, location), &points, SOIL_TTL_HOURS)
            .await
    }

    /// Empty series mean every source failed; they are not worth keeping
    async fn store_series<T: Serialize>(
        &self,
        kind: &str,
        key: &str,
        points: &[T],
        ttl_hours: i64,
    ) -> AppResult<()> {
        if points.is_empty() {
            tracing::debug!(kind, key, "Nothing to precompute");
            return Ok(());
        }
        self.cache.put_precomputed(kind, key, &points, ttl_hours).await
    }

    /// Weather, soil moisture and KPI for every catalogued field, plus the
    /// unfiltered KPI. Failures are logged per item.
    pub async fn precompute_all_fields(&self) {
        let field_ids: Vec<String> = self
            .analytics
            .catalogue()
            .fields(None, None)
            .into_iter()
            .map(|field| field.id)
            .collect();
        tracing::info!(fields = field_ids.len(), "Precomputing default-window analytics");

        log_failure("kpi", "all", self.precompute_kpi(&KpiRequest::default()).await);
        for field_id in &field_ids {
            log_failure(WEATHER_KIND, field_id, self.precompute_weather(field_id, None).await);
            log_failure(SOIL_KIND, field_id, self.precompute_soil(field_id, None).await);
            let request = KpiRequest {
                field_id: Some(field_id.clone()),
                ..KpiRequest::default()
            };
            log_failure(KPI_KIND, field_id, self.precompute_kpi(&request).await);
        }
        tracing::info!("Precompute finished");
    }

    /// Store an already computed payload without delaying the response
    pub fn spawn_store<T>(&self, kind: &'static str, key: String, data: T, ttl_hours: i64)
    where
        T: Serialize + Send + Sync + 'static,
    {
        let cache = self.cache.clone();
        spawn_logged(kind, async move {
            cache.put_precomputed(kind, &key, &data, ttl_hours).await
        });
    }
}

fn log_failure(kind: &str, key: &str, result: AppResult<()>) {
    if let Err(e) = result {
        tracing::warn!(kind, key, error = %e, "Precompute failed");
    }
}

/// Run `task` in the background, logging instead of propagating its error
pub fn spawn_logged<F>(label: &'static str, task: F)
where
    F: Future<Output = AppResult<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = task.await {
            tracing::warn!(task = label, error = %e, "Background task failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;
    use crate::external::SyntheticSource;
    use crate::services::catalogue::FieldCatalogue;
    use crate::services::sources::{DataSources, SourceTimeouts};
    use shared::KpiSummary;
    use std::sync::Arc;

    async fn service() -> PrecomputeService {
        let cache = CacheStore::in_memory(24).await.unwrap();
        let sources = DataSources::synthetic(SyntheticSource::seeded(3), SourceTimeouts::default())
            .with_cache(cache.clone());
        let analytics = AnalyticsService::new(
            sources,
            Arc::new(FieldCatalogue::reference()),
            AnalyticsConfig {
                grid_size: 16,
                fallback_half_width_deg: 0.005,
                noise_seed: Some(3),
            },
        );
        PrecomputeService::new(analytics, cache)
    }

    #[test]
    fn test_keys() {
        assert_eq!(kpi_key(&KpiRequest::default()), "all|all|all|auto");
        let request = KpiRequest {
            farm_id: Some("farm-1".to_string()),
            location: Some(LatLng::new(52.6, -113.1)),
            ..KpiRequest::default()
        };
        assert_eq!(kpi_key(&request), "farm-1|all|all|52.6000,-113.1000");
        assert_eq!(series_key("field-1", None), "field-1");
    }

    #[tokio::test]
    async fn test_precompute_all_fields_fills_the_cache() {
        let service = service().await;
        service.precompute_all_fields().await;

        let kpi = service
            .lookup::<KpiSummary>(KPI_KIND, &kpi_key(&KpiRequest::default()))
            .await;
        assert!(kpi.is_some());

        let weather = service
            .lookup::<Vec<TimeSeriesPoint>>(WEATHER_KIND, &series_key("field-3", None))
            .await
            .unwrap();
        assert_eq!(weather.data.len(), 31);

        let soil = service
            .lookup::<Vec<SoilMoisturePoint>>(SOIL_KIND, &series_key("field-4", None))
            .await
            .unwrap();
        assert!(soil.data.iter().all(|p| p.field_id == "field-4"));
    }

    #[tokio::test]
    async fn test_lookup_miss() {
        let service = service().await;
        assert!(service
            .lookup::<KpiSummary>(KPI_KIND, "nothing")
            .await
            .is_none());
    }
}
