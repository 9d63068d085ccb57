//! Validation utilities for request inputs and field geometry

use chrono::NaiveDate;

use crate::error::AnalyticsError;
use crate::models::Polygon;

// ============================================================================
// Geometry Validations
// ============================================================================

/// Minimum number of positions in a closed ring (triangle plus closing point)
pub const MIN_RING_POINTS: usize = 4;

/// Check that a polygon is a single closed exterior ring of finite, in-range
/// coordinates with at least four positions.
pub fn validate_polygon(polygon: &Polygon) -> Result<(), AnalyticsError> {
    if polygon.coordinates.len() > 1 {
        return Err(AnalyticsError::InvalidGeometry(
            "only a single exterior ring is supported".to_string(),
        ));
    }

    let ring = polygon.exterior();
    if ring.len() < MIN_RING_POINTS {
        return Err(AnalyticsError::InvalidGeometry(format!(
            "ring has {} points, at least {} required",
            ring.len(),
            MIN_RING_POINTS
        )));
    }

    for [lng, lat] in ring {
        if !lng.is_finite() || !lat.is_finite() {
            return Err(AnalyticsError::InvalidGeometry(
                "ring contains a non-finite coordinate".to_string(),
            ));
        }
        validate_latitude(*lat)
            .and(validate_longitude(*lng))
            .map_err(|msg| AnalyticsError::InvalidGeometry(msg.to_string()))?;
    }

    if ring.first() != ring.last() {
        return Err(AnalyticsError::InvalidGeometry("ring is not closed".to_string()));
    }

    Ok(())
}

// ============================================================================
// Coordinate Validations
// ============================================================================

pub fn validate_latitude(lat: f64) -> Result<(), &'static str> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err("Latitude must be between -90 and 90");
    }
    Ok(())
}

pub fn validate_longitude(lng: f64) -> Result<(), &'static str> {
    if !(-180.0..=180.0).contains(&lng) {
        return Err("Longitude must be between -180 and 180");
    }
    Ok(())
}

// ============================================================================
// Date Validations
// ============================================================================

/// Parse a `YYYY-MM-DD` date. A full ISO timestamp is accepted and truncated
/// to its calendar day.
pub fn parse_date(input: &str) -> Result<NaiveDate, AnalyticsError> {
    let trimmed = input.trim();
    trimmed
        .get(..10)
        .filter(|_| trimmed.len() == 10 || trimmed.as_bytes().get(10) == Some(&b'T'))
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .ok_or_else(|| AnalyticsError::InvalidDate(input.to_string()))
}
