//! Daily yield estimation from temperature, soil moisture and vegetation

use chrono::NaiveDate;
use rand::Rng;

use super::round_to;
use crate::models::{DailySeries, YieldPoint};
use crate::types::{day_timestamp, DateRange};

/// Baseline yield in t/ha before factors are applied
pub const BASE_YIELD: f64 = 40.0;

pub const DEFAULT_TEMPERATURE: f64 = 15.0;
pub const DEFAULT_SOIL_MOISTURE: f64 = 50.0;
pub const DEFAULT_VEGETATION_INDEX: f64 = 0.6;

/// Days covered by the fallback series
pub const FALLBACK_WINDOW_DAYS: i64 = 30;

pub fn temperature_factor(temp: f64) -> f64 {
    if (15.0..=25.0).contains(&temp) {
        1.0
    } else if temp < 15.0 {
        0.8 + (temp - 10.0) * 0.04
    } else {
        1.0 - (temp - 25.0) * 0.02
    }
}

pub fn soil_moisture_factor(moisture: f64) -> f64 {
    if (30.0..=60.0).contains(&moisture) {
        1.0
    } else if moisture < 30.0 {
        0.7 + (moisture / 30.0) * 0.3
    } else {
        1.0 - ((moisture - 60.0) / 40.0) * 0.3
    }
}

pub fn vegetation_factor(index: f64) -> f64 {
    0.5 + index * 0.5
}

/// 0.7 plus 0.1 per input series that had data, capped at 0.95
pub fn yield_confidence(series_with_data: usize) -> f64 {
    (0.7 + 0.1 * series_with_data as f64).min(0.95)
}

/// One yield point per day of `range`. Missing days fall back to the
/// documented defaults; the series is never empty for a valid range.
pub fn estimate_yield<R: Rng + ?Sized>(
    field_id: &str,
    temperature: &DailySeries,
    soil_moisture: &DailySeries,
    vegetation: &DailySeries,
    range: DateRange,
    rng: &mut R,
) -> Vec<YieldPoint> {
    let with_data = [temperature, soil_moisture, vegetation]
        .iter()
        .filter(|series| series.has_source_data())
        .count();
    let confidence = round_to(yield_confidence(with_data), 3);

    range
        .days()
        .map(|day| {
            let temp = temperature.get_or(day, DEFAULT_TEMPERATURE);
            let moisture = soil_moisture.get_or(day, DEFAULT_SOIL_MOISTURE);
            let index = vegetation.get_or(day, DEFAULT_VEGETATION_INDEX);

            let estimate = BASE_YIELD
                * temperature_factor(temp)
                * soil_moisture_factor(moisture)
                * vegetation_factor(index)
                + rng.gen_range(-2.0..=2.0);

            YieldPoint {
                timestamp: day_timestamp(day),
                value: round_to(estimate.max(0.0), 2),
                field_id: field_id.to_string(),
                confidence,
            }
        })
        .collect()
}

/// Placeholder trend served when the estimator cannot run: a gentle linear
/// rise over the last 30 days with wide noise.
pub fn fallback_yield_series<R: Rng + ?Sized>(
    field_id: &str,
    end: NaiveDate,
    rng: &mut R,
) -> Vec<YieldPoint> {
    DateRange::trailing(end, FALLBACK_WINDOW_DAYS)
        .days()
        .enumerate()
        .map(|(offset, day)| YieldPoint {
            timestamp: day_timestamp(day),
            value: round_to(40.0 + offset as f64 * 0.5 + rng.gen_range(-4.0..=4.0), 2),
            field_id: field_id.to_string(),
            confidence: round_to(0.85 + rng.gen_range(0.0..=0.1), 3),
        })
        .collect()
}
