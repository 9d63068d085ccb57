//! External data sources
//!
//! Each signal the analytics consume comes through one of the traits below.
//! Adapters are injected as `Arc<dyn ...>` so synthetic, live and test
//! sources are interchangeable.

use async_trait::async_trait;
use shared::{CropItem, DateRange, LatLng, Polygon, Raster, TimeSeriesPoint};

use crate::error::{AppError, AppResult};

pub mod climate;
pub mod copernicus;
pub mod fao;
pub mod synthetic;

pub use climate::ClimateClient;
pub use copernicus::{CopernicusClient, CredentialCache};
pub use fao::FaoClient;
pub use synthetic::SyntheticSource;

/// Daily air temperature (°C) and precipitation (mm)
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch_weather(&self, location: LatLng, range: DateRange)
        -> AppResult<Vec<TimeSeriesPoint>>;

    async fn fetch_precipitation(
        &self,
        _location: LatLng,
        _range: DateRange,
    ) -> AppResult<Vec<TimeSeriesPoint>> {
        Ok(Vec::new())
    }
}

/// Daily volumetric soil moisture (%)
#[async_trait]
pub trait SoilMoistureSource: Send + Sync {
    async fn fetch_soil_moisture(
        &self,
        location: LatLng,
        range: DateRange,
    ) -> AppResult<Vec<TimeSeriesPoint>>;
}

/// Vegetation index readings for a field polygon
#[async_trait]
pub trait VegetationSource: Send + Sync {
    async fn fetch_vegetation_timeline(
        &self,
        field_id: &str,
        polygon: &Polygon,
        range: DateRange,
    ) -> AppResult<Vec<TimeSeriesPoint>>;

    /// Raster of vegetation index values, 0.0 where masked
    async fn fetch_vegetation_raster(
        &self,
        field_id: &str,
        _polygon: &Polygon,
        _range: DateRange,
    ) -> AppResult<Raster> {
        Err(AppError::ExternalService(format!(
            "vegetation raster is not available from this source for {}",
            field_id
        )))
    }
}

/// Crop reference list used to enrich catalogue crops
#[async_trait]
pub trait CropReferenceSource: Send + Sync {
    /// Name of the reference, reported with every lookup
    fn name(&self) -> &'static str;

    async fn fetch_crop_items(&self) -> AppResult<Vec<CropItem>>;
}
