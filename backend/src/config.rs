//! Configuration management for the Field Analytics Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with FA__ prefix (e.g. FA__SERVER__PORT)

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Response cache configuration
    pub cache: CacheConfig,

    /// Which data sources to use and their deadlines
    pub sources: SourcesConfig,

    /// Climate reanalysis API configuration
    pub climate: ClimateConfig,

    /// Copernicus Data Space configuration
    pub copernicus: CopernicusConfig,

    /// FAOSTAT crop reference configuration
    pub fao: FaoConfig,

    /// Analytics tuning
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// SQLite connection URL
    pub database_url: String,

    /// How long fetched series stay valid
    pub ttl_hours: i64,
}

/// Data source selection
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Offline generators, no network access
    Synthetic,
    /// Climate reanalysis and Copernicus APIs
    Live,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    pub mode: SourceMode,

    /// Deadline for weather and soil moisture fetches
    pub weather_timeout_secs: u64,

    /// Deadline for vegetation index fetches
    pub vegetation_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClimateConfig {
    /// Reanalysis archive endpoint
    pub api_endpoint: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CopernicusConfig {
    /// OAuth client id
    pub client_id: Option<String>,

    /// OAuth client secret
    pub client_secret: Option<String>,

    pub token_url: String,
    pub statistics_url: String,
}

impl CopernicusConfig {
    pub fn has_credentials(&self) -> bool {
        matches!(
            (&self.client_id, &self.client_secret),
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty()
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FaoConfig {
    pub api_endpoint: String,

    /// Deadline for crop reference lookups
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    /// Edge length of served grids
    pub grid_size: usize,

    /// Half width of synthesized fallback field squares, degrees
    pub fallback_half_width_deg: f64,

    /// Fixed seed for the estimator jitter; random per request when unset
    pub noise_seed: Option<u64>,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("FA_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 8000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.cors_origins", vec!["http://localhost:3000"])?
            .set_default("cache.database_url", "sqlite://field_analytics_cache.db")?
            .set_default("cache.ttl_hours", 24 * 7)?
            .set_default("sources.mode", "synthetic")?
            .set_default("sources.weather_timeout_secs", 30)?
            .set_default("sources.vegetation_timeout_secs", 10)?
            .set_default("climate.api_endpoint", DEFAULT_CLIMATE_ENDPOINT)?
            .set_default("copernicus.token_url", DEFAULT_COPERNICUS_TOKEN_URL)?
            .set_default("copernicus.statistics_url", DEFAULT_COPERNICUS_STATISTICS_URL)?
            .set_default("fao.api_endpoint", DEFAULT_FAO_ENDPOINT)?
            .set_default("fao.timeout_secs", 10)?
            .set_default("analytics.grid_size", 64)?
            .set_default("analytics.fallback_half_width_deg", 0.005)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (FA__ prefix)
            .add_source(
                Environment::with_prefix("FA")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

pub const DEFAULT_CLIMATE_ENDPOINT: &str = "https://archive-api.open-meteo.com/v1";
pub const DEFAULT_COPERNICUS_TOKEN_URL: &str =
    "https://identity.dataspace.copernicus.eu/auth/realms/CDSE/protocol/openid-connect/token";
pub const DEFAULT_COPERNICUS_STATISTICS_URL: &str =
    "https://sh.dataspace.copernicus.eu/api/v1/statistics";
pub const DEFAULT_FAO_ENDPOINT: &str = "https://fenixservices.fao.org/faostat/api/v1/en";

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig::default(),
            cache: CacheConfig::default(),
            sources: SourcesConfig::default(),
            climate: ClimateConfig {
                api_endpoint: DEFAULT_CLIMATE_ENDPOINT.to_string(),
            },
            copernicus: CopernicusConfig {
                client_id: None,
                client_secret: None,
                token_url: DEFAULT_COPERNICUS_TOKEN_URL.to_string(),
                statistics_url: DEFAULT_COPERNICUS_STATISTICS_URL.to_string(),
            },
            fao: FaoConfig {
                api_endpoint: DEFAULT_FAO_ENDPOINT.to_string(),
                timeout_secs: 10,
            },
            analytics: AnalyticsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "0.0.0.0".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://field_analytics_cache.db".to_string(),
            ttl_hours: 24 * 7,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::Synthetic,
            weather_timeout_secs: 30,
            vegetation_timeout_secs: 10,
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            grid_size: shared::analytics::VISUALIZATION_GRID_SIZE,
            fallback_half_width_deg: shared::analytics::DEFAULT_HALF_WIDTH_DEG,
            noise_seed: None,
        }
    }
}
