//! Farms, crops and field boundaries known to the platform

use chrono::NaiveDate;
use shared::analytics::embedded_id;
use shared::analytics::geometry::{FARM_1_ANCHOR, FARM_2_ANCHOR};
use shared::{Crop, CropProfile, Farm, FieldBoundary, FieldProperties, Polygon};

/// In-memory catalogue of the reference farms
#[derive(Debug, Clone)]
pub struct FieldCatalogue {
    farms: Vec<Farm>,
    crops: Vec<Crop>,
    fields: Vec<FieldBoundary>,
}

impl FieldCatalogue {
    pub fn new(farms: Vec<Farm>, crops: Vec<Crop>, fields: Vec<FieldBoundary>) -> Self {
        Self {
            farms,
            crops,
            fields,
        }
    }

    /// Hartland Colony (canola) and the Vanderhoof reference field (timothy hay)
    pub fn reference() -> Self {
        let farms = vec![
            Farm {
                id: "farm-1".to_string(),
                name: "Hartland Colony".to_string(),
                location: FARM_1_ANCHOR,
                area: 250.5,
            },
            Farm {
                id: "farm-2".to_string(),
                name: "Exceedagro Reference Field".to_string(),
                location: FARM_2_ANCHOR,
                area: 180.3,
            },
        ];

        let crops = vec![
            crop("crop-1", "Canola", "Oilseed", (2024, 5, 1), (2024, 9, 15)),
            crop("crop-2", "Timothy Hay", "Forage", (2024, 4, 15), (2024, 7, 20)),
        ];

        let fields = vec![
            field("field-1", "farm-1", "crop-1", (-113.097639, -113.087639), (52.614167, 52.624167), 25.5, "Canola"),
            field("field-2", "farm-1", "crop-1", (-113.102639, -113.092639), (52.614167, 52.624167), 30.2, "Canola"),
            field("field-3", "farm-2", "crop-2", (-124.02167, -124.01167), (54.01167, 54.02167), 18.7, "Timothy Hay"),
            field("field-4", "farm-2", "crop-2", (-124.02667, -124.01667), (54.01167, 54.02167), 22.3, "Timothy Hay"),
        ];

        Self::new(farms, crops, fields)
    }

    pub fn farms(&self) -> &[Farm] {
        &self.farms
    }

    pub fn farm(&self, farm_id: &str) -> Option<&Farm> {
        self.farms.iter().find(|farm| farm.id == farm_id)
    }

    pub fn crops(&self) -> &[Crop] {
        &self.crops
    }

    pub fn crop(&self, crop_id: &str) -> Option<&Crop> {
        self.crops.iter().find(|crop| crop.id == crop_id)
    }

    pub fn field(&self, field_id: &str) -> Option<&FieldBoundary> {
        self.fields.iter().find(|field| field.id == field_id)
    }

    /// Fields matching the optional farm and crop filters
    pub fn fields(&self, farm_id: Option<&str>, crop_id: Option<&str>) -> Vec<FieldBoundary> {
        self.fields
            .iter()
            .filter(|field| farm_id.map_or(true, |id| field.farm_id == id))
            .filter(|field| crop_id.map_or(true, |id| field.crop_id == id))
            .cloned()
            .collect()
    }

    /// Catalogued boundary of a field, if any
    pub fn resolve_field_geometry(&self, field_id: &str) -> Option<Polygon> {
        self.field(field_id).map(|field| field.geometry.clone())
    }

    /// Crop profile of a catalogued field, or one inferred from a `crop-N`
    /// reference in the id
    pub fn crop_profile_for_field(&self, field_id: &str) -> Option<CropProfile> {
        if let Some(field) = self.field(field_id) {
            return Some(CropProfile::from_name(&field.properties.crop_type));
        }
        match embedded_id(field_id, "crop").as_deref() {
            Some("crop-1") => Some(CropProfile::Canola),
            Some("crop-2") => Some(CropProfile::TimothyHay),
            _ => None,
        }
    }
}

impl Default for FieldCatalogue {
    fn default() -> Self {
        Self::reference()
    }
}

fn date((y, m, d): (i32, u32, u32)) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn crop(
    id: &str,
    name: &str,
    crop_type: &str,
    planted: (i32, u32, u32),
    harvest: (i32, u32, u32),
) -> Crop {
    Crop {
        id: id.to_string(),
        name: name.to_string(),
        crop_type: crop_type.to_string(),
        planting_date: date(planted),
        expected_harvest_date: date(harvest),
    }
}

fn field(
    id: &str,
    farm_id: &str,
    crop_id: &str,
    (west, east): (f64, f64),
    (south, north): (f64, f64),
    area: f64,
    crop_type: &str,
) -> FieldBoundary {
    FieldBoundary {
        id: id.to_string(),
        farm_id: farm_id.to_string(),
        crop_id: crop_id.to_string(),
        geometry: Polygon::from_ring(vec![
            [west, south],
            [east, south],
            [east, north],
            [west, north],
            [west, south],
        ]),
        properties: FieldProperties {
            area,
            crop_type: crop_type.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::validate_polygon;

    #[test]
    fn test_reference_geometry_is_valid() {
        let catalogue = FieldCatalogue::reference();
        for field in catalogue.fields(None, None) {
            assert!(validate_polygon(&field.geometry).is_ok(), "{}", field.id);
        }
    }

    #[test]
    fn test_field_filters() {
        let catalogue = FieldCatalogue::reference();
        assert_eq!(catalogue.fields(Some("farm-1"), None).len(), 2);
        assert_eq!(catalogue.fields(None, Some("crop-2")).len(), 2);
        assert!(catalogue.fields(Some("farm-1"), Some("crop-2")).is_empty());
        assert_eq!(catalogue.fields(None, None).len(), 4);
    }

    #[test]
    fn test_crop_profiles() {
        let catalogue = FieldCatalogue::reference();
        assert_eq!(catalogue.crop_profile_for_field("field-3"), Some(CropProfile::TimothyHay));
        assert_eq!(catalogue.crop_profile_for_field("x-crop-1"), Some(CropProfile::Canola));
        assert_eq!(catalogue.crop_profile_for_field("unknown"), None);
        assert_eq!(catalogue.crop_profile_for_field("field-farm-1-crop-12"), None);
        assert_eq!(
            catalogue.crop_profile_for_field("field-farm-1-crop-2"),
            Some(CropProfile::TimothyHay)
        );
    }

    #[test]
    fn test_unknown_field_has_no_geometry() {
        assert!(FieldCatalogue::reference().resolve_field_geometry("field-99").is_none());
    }
}
