//! Time-indexed environmental signals

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::day_timestamp;

/// One sample of a signal (temperature, precipitation, vegetation index, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSeriesPoint {
    pub timestamp: String,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(timestamp: impl Into<String>, value: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            value,
        }
    }

    /// Point stamped at midnight of `day`
    pub fn daily(day: NaiveDate, value: f64) -> Self {
        Self::new(day_timestamp(day), value)
    }

    /// Calendar day of the point, taken from the `YYYY-MM-DD` prefix
    pub fn day(&self) -> Option<NaiveDate> {
        self.timestamp
            .get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
    }
}

/// Soil moisture sample as served by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SoilMoisturePoint {
    pub timestamp: String,
    pub value: f64,
    pub field_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
}

/// A series re-keyed by calendar day for date-indexed lookups.
///
/// Later points overwrite earlier ones for the same day. Points whose
/// timestamp has no parseable day are skipped, but still count towards
/// [`DailySeries::has_source_data`].
#[derive(Debug, Clone, Default)]
pub struct DailySeries {
    values: HashMap<NaiveDate, f64>,
    source_len: usize,
}

impl DailySeries {
    pub fn from_points(points: &[TimeSeriesPoint]) -> Self {
        let values = points
            .iter()
            .filter_map(|point| point.day().map(|day| (day, point.value)))
            .collect();
        Self {
            values,
            source_len: points.len(),
        }
    }

    pub fn get(&self, day: NaiveDate) -> Option<f64> {
        self.values.get(&day).copied()
    }

    pub fn get_or(&self, day: NaiveDate, default: f64) -> f64 {
        self.get(day).unwrap_or(default)
    }

    /// Whether the upstream series had any points at all
    pub fn has_source_data(&self) -> bool {
        self.source_len > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_day_parses_prefix_of_any_iso_timestamp() {
        assert_eq!(
            TimeSeriesPoint::new("2024-06-01T12:00:00Z", 1.0).day(),
            Some(date("2024-06-01"))
        );
        assert_eq!(TimeSeriesPoint::new("2024-06-01", 1.0).day(), Some(date("2024-06-01")));
        assert_eq!(TimeSeriesPoint::new("junk", 1.0).day(), None);
    }

    #[test]
    fn test_last_point_wins_for_duplicate_days() {
        let points = vec![
            TimeSeriesPoint::new("2024-06-01T00:00:00", 1.0),
            TimeSeriesPoint::new("2024-06-01T12:00:00", 2.0),
        ];
        let series = DailySeries::from_points(&points);
        assert_eq!(series.get(date("2024-06-01")), Some(2.0));
        assert_eq!(series.get(date("2024-06-02")), None);
    }

    #[test]
    fn test_get_or_falls_back_for_missing_day() {
        let series = DailySeries::from_points(&[TimeSeriesPoint::daily(date("2024-06-01"), 3.0)]);
        assert_eq!(series.get_or(date("2024-06-02"), 15.0), 15.0);
        assert!(series.has_source_data());
        assert!(!DailySeries::default().has_source_data());
    }
}
