//! Farm, crop and field catalogue models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::geometry::Polygon;
use crate::types::LatLng;

/// Farm record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Farm {
    pub id: String,
    pub name: String,
    pub location: LatLng,
    /// Area in hectares
    pub area: f64,
}

/// Crop planting record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Crop {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub crop_type: String,
    pub planting_date: NaiveDate,
    pub expected_harvest_date: NaiveDate,
}

/// Field boundary with its farm and crop links
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldBoundary {
    pub id: String,
    pub farm_id: String,
    pub crop_id: String,
    pub geometry: Polygon,
    pub properties: FieldProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldProperties {
    /// Area in hectares
    pub area: f64,
    pub crop_type: String,
}

/// Entry of an external crop reference list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CropItem {
    pub item_code: Option<String>,
    pub item_name: String,
    pub item_group: Option<String>,
    pub item_group_code: Option<String>,
}

/// Short form of a reference entry, listed when nothing matched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CropItemRef {
    pub code: Option<String>,
    pub name: String,
}

impl From<&CropItem> for CropItemRef {
    fn from(item: &CropItem) -> Self {
        Self {
            code: item.item_code.clone(),
            name: item.item_name.clone(),
        }
    }
}

/// Reference metadata for a crop.
///
/// Lookup failures are reported in `error` rather than as an HTTP error;
/// `matched` is then absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CropMetadata {
    pub crop_id: String,
    pub crop_name: Option<String>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<bool>,
    pub metadata: Option<CropItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_items: Option<Vec<CropItemRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
