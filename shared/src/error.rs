//! Errors raised by the pure analytics layer

use chrono::NaiveDate;
use thiserror::Error;

/// Validation failures detected before any computation runs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid date range: end {end} is before start {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Coordinate out of range: {0}")]
    InvalidCoordinate(String),
}
