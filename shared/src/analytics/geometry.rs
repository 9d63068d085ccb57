//! Bounds, centers and fallback boundaries for field polygons

use crate::models::{BoundingBox, Polygon};
use crate::types::LatLng;

/// Half edge of a synthesized fallback square, in degrees
pub const DEFAULT_HALF_WIDTH_DEG: f64 = 0.005;

/// Hartland Colony, Alberta
pub const FARM_1_ANCHOR: LatLng = LatLng {
    lat: 52.619167,
    lng: -113.092639,
};

/// Vanderhoof, British Columbia
pub const FARM_2_ANCHOR: LatLng = LatLng {
    lat: 54.0167,
    lng: -124.0167,
};

/// Anchor for a named farm
pub fn farm_anchor(farm_id: &str) -> Option<LatLng> {
    match farm_id {
        "farm-1" => Some(FARM_1_ANCHOR),
        "farm-2" => Some(FARM_2_ANCHOR),
        _ => None,
    }
}

/// Anchor for a field id that embeds a farm reference such as
/// `farm-2-field-7`; defaults to farm-1.
pub fn anchor_for_field(field_id: &str) -> LatLng {
    embedded_id(field_id, "farm")
        .and_then(|farm_id| farm_anchor(&farm_id))
        .unwrap_or(FARM_1_ANCHOR)
}

/// First `{kind}-N` reference inside `text`, with the full digit run:
/// `embedded_id("field-farm-1-crop-12", "crop")` is `crop-12`.
pub fn embedded_id(text: &str, kind: &str) -> Option<String> {
    let marker = format!("{}-", kind);
    text.match_indices(&marker).find_map(|(at, _)| {
        let digits: String = text[at + marker.len()..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        (!digits.is_empty()).then(|| format!("{}{}", marker, digits))
    })
}

/// Bounding box of the exterior ring. An empty ring yields a zero box.
pub fn resolve_bounds(polygon: &Polygon) -> BoundingBox {
    let ring = polygon.exterior();
    if ring.is_empty() {
        return BoundingBox {
            north: 0.0,
            south: 0.0,
            east: 0.0,
            west: 0.0,
        };
    }

    ring.iter().fold(
        BoundingBox {
            north: f64::NEG_INFINITY,
            south: f64::INFINITY,
            east: f64::NEG_INFINITY,
            west: f64::INFINITY,
        },
        |bounds, [lng, lat]| BoundingBox {
            north: bounds.north.max(*lat),
            south: bounds.south.min(*lat),
            east: bounds.east.max(*lng),
            west: bounds.west.min(*lng),
        },
    )
}

/// Midpoint of the polygon's bounding box
pub fn resolve_center(polygon: &Polygon) -> LatLng {
    let bounds = resolve_bounds(polygon);
    LatLng {
        lat: (bounds.north + bounds.south) / 2.0,
        lng: (bounds.east + bounds.west) / 2.0,
    }
}

/// Closed square ring around `anchor`: SW, SE, NE, NW, SW
pub fn synthesize_fallback_polygon(anchor: LatLng, half_width_deg: f64) -> Polygon {
    let (south, north) = (anchor.lat - half_width_deg, anchor.lat + half_width_deg);
    let (west, east) = (anchor.lng - half_width_deg, anchor.lng + half_width_deg);
    Polygon::from_ring(vec![
        [west, south],
        [east, south],
        [east, north],
        [west, north],
        [west, south],
    ])
}

/// Catalogue geometry when known, otherwise a square around the anchor of
/// the farm embedded in the field id
pub fn resolve_field_polygon(
    field_id: &str,
    known: Option<Polygon>,
    half_width_deg: f64,
) -> Polygon {
    known.unwrap_or_else(|| {
        synthesize_fallback_polygon(anchor_for_field(field_id), half_width_deg)
    })
}

/// Even-odd ray casting test against the exterior ring
pub fn contains_point(polygon: &Polygon, lat: f64, lng: f64) -> bool {
    let ring = polygon.exterior();
    let mut inside = false;
    for (a, b) in ring.iter().zip(ring.iter().skip(1)) {
        let ([x1, y1], [x2, y2]) = (*a, *b);
        if (y1 > lat) != (y2 > lat) {
            let crossing = x1 + (lat - y1) * (x2 - x1) / (y2 - y1);
            if lng < crossing {
                inside = !inside;
            }
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_polygon_is_closed_square() {
        let polygon = synthesize_fallback_polygon(FARM_2_ANCHOR, 0.005);
        let ring = polygon.exterior();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], ring[4]);

        let bounds = resolve_bounds(&polygon);
        assert!((bounds.north - 54.0217).abs() < 1e-9);
        assert!((bounds.south - 54.0117).abs() < 1e-9);
        assert!((bounds.east - -124.0117).abs() < 1e-9);
        assert!((bounds.west - -124.0217).abs() < 1e-9);
    }

    #[test]
    fn test_center_of_fallback_is_anchor() {
        let center = resolve_center(&synthesize_fallback_polygon(FARM_1_ANCHOR, 0.01));
        assert!((center.lat - FARM_1_ANCHOR.lat).abs() < 1e-9);
        assert!((center.lng - FARM_1_ANCHOR.lng).abs() < 1e-9);
    }

    #[test]
    fn test_anchor_lookup_from_field_id() {
        assert_eq!(anchor_for_field("farm-2-field-7"), FARM_2_ANCHOR);
        assert_eq!(anchor_for_field("field-x"), FARM_1_ANCHOR);
        assert_eq!(anchor_for_field("farm-99"), FARM_1_ANCHOR);
        assert_eq!(anchor_for_field("farm-"), FARM_1_ANCHOR);
    }

    #[test]
    fn test_embedded_id_reads_whole_number() {
        assert_eq!(embedded_id("field-farm-1-crop-12", "crop").as_deref(), Some("crop-12"));
        assert_eq!(embedded_id("field-farm-1-crop-12", "farm").as_deref(), Some("farm-1"));
        assert_eq!(embedded_id("field-crop-", "crop"), None);
        assert_eq!(embedded_id("field-7", "crop"), None);
        assert_eq!(embedded_id("crop-a-crop-2", "crop").as_deref(), Some("crop-2"));
    }

    #[test]
    fn test_known_geometry_wins() {
        let known = synthesize_fallback_polygon(LatLng::new(1.0, 2.0), 0.1);
        let resolved = resolve_field_polygon("farm-2-a", Some(known.clone()), 0.005);
        assert_eq!(resolved, known);
    }

    #[test]
    fn test_contains_point() {
        let square = synthesize_fallback_polygon(LatLng::new(10.0, 20.0), 1.0);
        assert!(contains_point(&square, 10.0, 20.0));
        assert!(!contains_point(&square, 12.0, 20.0));
        assert!(!contains_point(&square, 10.0, 18.5));
    }
}
