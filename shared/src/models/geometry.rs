//! Field boundary geometry

use serde::{Deserialize, Serialize};

/// GeoJSON `Polygon` geometry. Coordinates are `[lng, lat]` pairs and only
/// the first (exterior) ring is used by the analytics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename = "Polygon")]
pub struct Polygon {
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl Polygon {
    pub fn from_ring(ring: Vec<[f64; 2]>) -> Self {
        Self {
            coordinates: vec![ring],
        }
    }

    /// Exterior ring, empty when the geometry carries no rings
    pub fn exterior(&self) -> &[[f64; 2]] {
        self.coordinates.first().map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Axis-aligned bounds in degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_serializes_as_geojson() {
        let polygon = Polygon::from_ring(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]);
        let json = serde_json::to_value(&polygon).unwrap();
        assert_eq!(json["type"], "Polygon");
        assert_eq!(json["coordinates"][0][1][0], 1.0);

        let back: Polygon = serde_json::from_value(json).unwrap();
        assert_eq!(back, polygon);
    }

    #[test]
    fn test_exterior_of_empty_geometry() {
        let polygon = Polygon {
            coordinates: Vec::new(),
        };
        assert!(polygon.exterior().is_empty());
    }
}
