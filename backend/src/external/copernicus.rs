//! Copernicus Data Space client for Sentinel-2 vegetation index statistics
//!
//! Authenticates with OAuth2 client credentials and queries the Sentinel Hub
//! Statistical API for the daily mean NDVI over a field polygon.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use shared::analytics::round_to;
use shared::{DateRange, Polygon, TimeSeriesPoint};
use tokio::sync::RwLock;

use super::VegetationSource;
use crate::config::CopernicusConfig;
use crate::error::{AppError, AppResult};

/// Tokens are refreshed this long before they actually expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

const NDVI_EVALSCRIPT: &str = r#"//VERSION=3
function setup() {
  return {
    input: [{ bands: ["B04", "B08", "dataMask"] }],
    output: [
      { id: "ndvi", bands: 1, sampleType: "FLOAT32" },
      { id: "dataMask", bands: 1 }
    ]
  };
}
function evaluatePixel(s) {
  let ndvi = (s.B08 - s.B04) / (s.B08 + s.B04);
  return { ndvi: [ndvi], dataMask: [s.dataMask] };
}"#;

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Access token holder shared by every request of one client
#[derive(Debug, Default)]
pub struct CredentialCache {
    token: RwLock<Option<CachedToken>>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached token, unless it is within the refresh margin of expiry
    pub async fn valid_token(&self) -> Option<String> {
        let guard = self.token.read().await;
        guard
            .as_ref()
            .filter(|token| Instant::now() < token.refresh_at)
            .map(|token| token.access_token.clone())
    }

    pub async fn store(&self, access_token: String, expires_in: Duration) {
        let refresh_at = Instant::now() + expires_in.saturating_sub(TOKEN_REFRESH_MARGIN);
        *self.token.write().await = Some(CachedToken {
            access_token,
            refresh_at,
        });
    }

    pub async fn clear(&self) {
        *self.token.write().await = None;
    }
}

/// Copernicus Data Space API client
#[derive(Clone)]
pub struct CopernicusClient {
    client: Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    statistics_url: String,
    credentials: Arc<CredentialCache>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    300
}

#[derive(Debug, Deserialize)]
struct StatisticsResponse {
    #[serde(default)]
    data: Vec<StatisticsInterval>,
}

#[derive(Debug, Deserialize)]
struct StatisticsInterval {
    interval: Interval,
    outputs: Outputs,
}

#[derive(Debug, Deserialize)]
struct Interval {
    from: String,
}

#[derive(Debug, Deserialize)]
struct Outputs {
    ndvi: BandOutput,
}

#[derive(Debug, Deserialize)]
struct BandOutput {
    bands: Bands,
}

#[derive(Debug, Deserialize)]
struct Bands {
    #[serde(rename = "B0")]
    b0: BandStats,
}

#[derive(Debug, Deserialize)]
struct BandStats {
    stats: Stats,
}

/// `mean` is the string "NaN" when every pixel was masked
#[derive(Debug, Deserialize)]
struct Stats {
    mean: serde_json::Value,
}

impl CopernicusClient {
    /// Build a client; fails when the credentials are missing
    pub fn new(config: &CopernicusConfig, credentials: Arc<CredentialCache>) -> AppResult<Self> {
        let (Some(client_id), Some(client_secret)) =
            (config.client_id.clone(), config.client_secret.clone())
        else {
            return Err(AppError::Configuration(
                "Copernicus client_id and client_secret are required".to_string(),
            ));
        };

        Ok(Self {
            client: Client::new(),
            client_id,
            client_secret,
            token_url: config.token_url.clone(),
            statistics_url: config.statistics_url.clone(),
            credentials,
        })
    }

    /// Access token from the cache, fetching a new one when needed
    pub async fn access_token(&self) -> AppResult<String> {
        if let Some(token) = self.credentials.valid_token().await {
            return Ok(token);
        }

        tracing::debug!("Requesting Copernicus access token");
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Copernicus auth failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Copernicus auth error: {} - {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("Failed to parse Copernicus token: {}", e))
        })?;

        self.credentials
            .store(token.access_token.clone(), Duration::from_secs(token.expires_in))
            .await;
        Ok(token.access_token)
    }

    fn statistics_request(polygon: &Polygon, range: DateRange) -> serde_json::Value {
        json!({
            "input": {
                "bounds": {
                    "geometry": polygon,
                    "properties": { "crs": "http://www.opengis.net/def/crs/EPSG/0/4326" }
                },
                "data": [{
                    "type": "sentinel-2-l2a",
                    "dataFilter": { "maxCloudCoverage": 30 }
                }]
            },
            "aggregation": {
                "timeRange": {
                    "from": format!("{}T00:00:00Z", range.start),
                    "to": format!("{}T23:59:59Z", range.end)
                },
                "aggregationInterval": { "of": "P1D" },
                "evalscript": NDVI_EVALSCRIPT,
                "resx": 0.0001,
                "resy": 0.0001
            }
        })
    }
}

/// Keep intervals with a numeric mean, clamped to the NDVI domain
fn timeline_from_statistics(response: StatisticsResponse) -> Vec<TimeSeriesPoint> {
    response
        .data
        .into_iter()
        .filter_map(|interval| {
            let mean = interval.outputs.ndvi.bands.b0.stats.mean.as_f64()?;
            mean.is_finite().then(|| {
                TimeSeriesPoint::new(interval.interval.from, round_to(mean.clamp(-1.0, 1.0), 3))
            })
        })
        .collect()
}

#[async_trait]
impl VegetationSource for CopernicusClient {
    async fn fetch_vegetation_timeline(
        &self,
        field_id: &str,
        polygon: &Polygon,
        range: DateRange,
    ) -> AppResult<Vec<TimeSeriesPoint>> {
        let token = self.access_token().await?;

        let response = self
            .client
            .post(&self.statistics_url)
            .bearer_auth(&token)
            .json(&Self::statistics_request(polygon, range))
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalService(format!("Copernicus statistics request failed: {}", e))
            })?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.credentials.clear().await;
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Copernicus statistics error: {} - {}",
                status, body
            )));
        }

        let statistics: StatisticsResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("Failed to parse Copernicus statistics: {}", e))
        })?;

        let timeline = timeline_from_statistics(statistics);
        tracing::debug!(field_id, points = timeline.len(), "Fetched vegetation timeline");
        Ok(timeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_credential_cache_expiry() {
        let cache = CredentialCache::new();
        assert!(cache.valid_token().await.is_none());

        cache.store("abc".to_string(), Duration::from_secs(3600)).await;
        assert_eq!(cache.valid_token().await.as_deref(), Some("abc"));

        // A token living less than the refresh margin is already stale
        cache.store("short".to_string(), Duration::from_secs(30)).await;
        assert!(cache.valid_token().await.is_none());

        cache.store("abc".to_string(), Duration::from_secs(3600)).await;
        cache.clear().await;
        assert!(cache.valid_token().await.is_none());
    }

    #[test]
    fn test_client_requires_credentials() {
        let config = Config::default().copernicus;
        assert!(CopernicusClient::new(&config, Arc::new(CredentialCache::new())).is_err());
    }

    #[test]
    fn test_statistics_parsing_skips_masked_days() {
        let json = r#"{
            "data": [
                {"interval": {"from": "2024-06-01T00:00:00Z", "to": "2024-06-02T00:00:00Z"},
                 "outputs": {"ndvi": {"bands": {"B0": {"stats": {"mean": 0.61234, "sampleCount": 100}}}}}},
                {"interval": {"from": "2024-06-02T00:00:00Z", "to": "2024-06-03T00:00:00Z"},
                 "outputs": {"ndvi": {"bands": {"B0": {"stats": {"mean": "NaN"}}}}}}
            ]
        }"#;
        let response: StatisticsResponse = serde_json::from_str(json).unwrap();
        let timeline = timeline_from_statistics(response);
        assert_eq!(timeline, vec![TimeSeriesPoint::new("2024-06-01T00:00:00Z", 0.612)]);
    }

    #[test]
    fn test_request_embeds_geojson_polygon() {
        let polygon = Polygon::from_ring(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]);
        let range = DateRange::trailing(chrono::NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(), 14);
        let body = CopernicusClient::statistics_request(&polygon, range);
        assert_eq!(body["input"]["bounds"]["geometry"]["type"], "Polygon");
        assert_eq!(body["aggregation"]["timeRange"]["from"], "2024-06-16T00:00:00Z");
    }
}
