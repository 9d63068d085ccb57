//! Daily carbon sequestration estimation

use chrono::NaiveDate;
use rand::Rng;

use super::round_to;
use super::yield_prediction::{DEFAULT_TEMPERATURE, DEFAULT_VEGETATION_INDEX, FALLBACK_WINDOW_DAYS};
use crate::models::{CarbonMetricType, CarbonPoint, DailySeries};
use crate::types::{day_timestamp, DateRange};

/// Sequestration under ideal conditions, t CO2e/ha/day
pub const BASE_SEQUESTRATION: f64 = 2.0;
/// Fixed daily emissions subtracted to obtain the net flux
pub const ESTIMATED_EMISSIONS: f64 = 0.5;

pub fn carbon_temperature_factor(temp: f64) -> f64 {
    if (15.0..=25.0).contains(&temp) {
        1.0
    } else {
        0.8
    }
}

/// One carbon point per day of `range`; net flux when positive, otherwise
/// the gross sequestration.
pub fn estimate_carbon<R: Rng + ?Sized>(
    field_id: &str,
    temperature: &DailySeries,
    vegetation: &DailySeries,
    range: DateRange,
    rng: &mut R,
) -> Vec<CarbonPoint> {
    range
        .days()
        .map(|day| {
            let temp = temperature.get_or(day, DEFAULT_TEMPERATURE);
            let index = vegetation.get_or(day, DEFAULT_VEGETATION_INDEX);

            let sequestration = (BASE_SEQUESTRATION
                * (0.5 + index * 0.5)
                * carbon_temperature_factor(temp)
                + rng.gen_range(-0.25..=0.25))
            .max(0.0);
            let net = sequestration - ESTIMATED_EMISSIONS;

            let (value, metric_type) = if net > 0.0 {
                (net, CarbonMetricType::Net)
            } else {
                (sequestration, CarbonMetricType::Sequestration)
            };

            CarbonPoint {
                timestamp: day_timestamp(day),
                value: round_to(value, 2),
                field_id: field_id.to_string(),
                metric_type,
            }
        })
        .collect()
}

/// Placeholder series served when the estimator cannot run
pub fn fallback_carbon_series<R: Rng + ?Sized>(
    field_id: &str,
    end: NaiveDate,
    rng: &mut R,
) -> Vec<CarbonPoint> {
    const METRIC_TYPES: [CarbonMetricType; 3] = [
        CarbonMetricType::Sequestration,
        CarbonMetricType::Emission,
        CarbonMetricType::Net,
    ];

    DateRange::trailing(end, FALLBACK_WINDOW_DAYS)
        .days()
        .map(|day| CarbonPoint {
            timestamp: day_timestamp(day),
            value: round_to(45.0 + rng.gen_range(-6.0..=6.0), 2),
            field_id: field_id.to_string(),
            metric_type: METRIC_TYPES[rng.gen_range(0..METRIC_TYPES.len())],
        })
        .collect()
}
