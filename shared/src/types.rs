//! Common types used across the platform

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// Geographic point in decimal degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting an end that precedes the start
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AnalyticsError> {
        if end < start {
            return Err(AnalyticsError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days` days leading up to and including `end`
    pub fn trailing(end: NaiveDate, days: i64) -> Self {
        Self {
            start: end - Duration::days(days.max(0)),
            end,
        }
    }

    /// Trailing window ending today (UTC)
    pub fn last_days(days: i64) -> Self {
        Self::trailing(Utc::now().date_naive(), days)
    }

    /// Every day in the range, in chronological order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }

    pub fn day_count(&self) -> usize {
        ((self.end - self.start).num_days() + 1).max(0) as usize
    }
}

/// Outcome marker carried by every API envelope
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Envelope wrapping every API payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub timestamp: String,
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::success_at(data, now_timestamp())
    }

    /// Success envelope stamped with an explicit time, e.g. when serving a
    /// precomputed payload
    pub fn success_at(data: T, timestamp: String) -> Self {
        Self {
            data,
            timestamp,
            status: ResponseStatus::Success,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Current UTC time as an RFC 3339 string
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339()
}

/// Midnight timestamp used for daily series points
pub fn day_timestamp(day: NaiveDate) -> String {
    format!("{}T00:00:00", day.format("%Y-%m-%d"))
}
