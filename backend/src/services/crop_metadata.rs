//! Crop reference metadata
//!
//! Matches catalogue crops against an external reference list: first by
//! the known item code for the crop name, then by a name search. Lookup
//! failures end up in the payload, never as an HTTP error.

use std::sync::Arc;
use std::time::Duration;

use shared::{CropItem, CropItemRef, CropMetadata};

use super::FieldCatalogue;
use crate::config::{Config, SourceMode};
use crate::error::AppError;
use crate::external::{CropReferenceSource, FaoClient, SyntheticSource};

/// Reference entries listed when a crop has no match
const AVAILABLE_ITEMS_LIMIT: usize = 20;

/// FAOSTAT item code for a lowercase crop name
pub fn fao_item_code(crop_name: &str) -> Option<&'static str> {
    match crop_name {
        "tomatoes" => Some("2547"),
        "corn" => Some("56"),
        "wheat" => Some("15"),
        "rice" => Some("27"),
        "soybeans" => Some("236"),
        "potatoes" => Some("116"),
        "barley" => Some("44"),
        "sorghum" => Some("83"),
        "millet" => Some("79"),
        "oats" => Some("75"),
        _ => None,
    }
}

#[derive(Clone)]
pub struct CropMetadataService {
    source: Arc<dyn CropReferenceSource>,
    catalogue: Arc<FieldCatalogue>,
}

impl CropMetadataService {
    pub fn new(source: Arc<dyn CropReferenceSource>, catalogue: Arc<FieldCatalogue>) -> Self {
        Self { source, catalogue }
    }

    pub fn from_config(config: &Config, catalogue: Arc<FieldCatalogue>) -> Self {
        let source: Arc<dyn CropReferenceSource> = match config.sources.mode {
            SourceMode::Synthetic => Arc::new(SyntheticSource::new()),
            SourceMode::Live => Arc::new(
                FaoClient::with_base_url(config.fao.api_endpoint.clone())
                    .with_timeout(Duration::from_secs(config.fao.timeout_secs)),
            ),
        };
        Self::new(source, catalogue)
    }

    /// Metadata for `crop_id`. Without an explicit name the catalogue name
    /// of the crop is used.
    pub async fn crop_metadata(&self, crop_id: &str, crop_name: Option<&str>) -> CropMetadata {
        let crop_name = crop_name
            .map(str::to_string)
            .or_else(|| self.catalogue.crop(crop_id).map(|crop| crop.name.to_lowercase()));

        match self.source.fetch_crop_items().await {
            Ok(items) => describe_crop(crop_id, crop_name, self.source.name(), &items),
            Err(e) => {
                tracing::warn!(crop_id, error = %e, "Crop reference lookup failed");
                CropMetadata {
                    crop_id: crop_id.to_string(),
                    crop_name,
                    source: self.source.name().to_string(),
                    matched: None,
                    metadata: None,
                    available_items: None,
                    error: Some(lookup_error(e)),
                }
            }
        }
    }
}

fn lookup_error(err: AppError) -> String {
    match err {
        AppError::Timeout(_) => "Request timeout".to_string(),
        AppError::ExternalService(message) => message,
        other => other.to_string(),
    }
}

fn describe_crop(
    crop_id: &str,
    crop_name: Option<String>,
    source: &str,
    items: &[CropItem],
) -> CropMetadata {
    let matched = crop_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .and_then(|name| match_item(&name.to_lowercase(), items))
        .cloned();

    let available_items = matched.is_none().then(|| {
        items
            .iter()
            .take(AVAILABLE_ITEMS_LIMIT)
            .map(CropItemRef::from)
            .collect()
    });

    CropMetadata {
        crop_id: crop_id.to_string(),
        crop_name,
        source: source.to_string(),
        matched: Some(matched.is_some()),
        metadata: matched,
        available_items,
        error: None,
    }
}

fn match_item<'a>(name: &str, items: &'a [CropItem]) -> Option<&'a CropItem> {
    fao_item_code(name)
        .and_then(|code| {
            items
                .iter()
                .find(|item| item.item_code.as_deref() == Some(code))
        })
        .or_else(|| {
            items
                .iter()
                .find(|item| item.item_name.to_lowercase().contains(name))
        })
}
