//! Business logic services for the Field Analytics Platform

pub mod analytics;
pub mod cache;
pub mod catalogue;
pub mod crop_metadata;
pub mod precompute;
pub mod sources;

pub use analytics::{AnalyticsService, KpiRequest};
pub use cache::CacheStore;
pub use catalogue::FieldCatalogue;
pub use crop_metadata::CropMetadataService;
pub use precompute::PrecomputeService;
pub use sources::{DataSources, SourceTimeouts};
