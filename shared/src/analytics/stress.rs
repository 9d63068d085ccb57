//! Crop stress scoring
//!
//! The score combines three weighted factors:
//! - vegetation (40): decline of the vegetation index over 14 days, or its
//!   absolute level when no earlier reading exists
//! - water (30): 7-day rainfall deficit relative to the crop minimum
//! - heat (30): 7-day mean temperature outside the crop's optimal band

use chrono::{Duration, NaiveDate};
use rand::Rng;

use crate::models::{
    CropProfile, Grid, StressAssessment, StressComponents, StressLevel, TimeSeriesPoint,
};

const VEGETATION_WEIGHT: f64 = 40.0;
const WATER_WEIGHT: f64 = 30.0;
const HEAT_WEIGHT: f64 = 30.0;

/// Maximum absolute jitter applied per cell when expanding a score into a grid
pub const GRID_JITTER: f64 = 0.2;

/// Score stress for one field.
///
/// Defined for every finite input; the score is clamped to [0, 100].
pub fn score_stress(
    vegetation_now: f64,
    vegetation_prev14: Option<f64>,
    temp_7d_avg: f64,
    rain_7d_total: f64,
    profile: CropProfile,
) -> StressAssessment {
    let thresholds = profile.thresholds();
    let mut reasons = Vec::new();

    let vegetation = match vegetation_prev14 {
        Some(prev) => {
            let drop = prev - vegetation_now;
            if drop > 0.1 {
                reasons.push("vegetation index dropped significantly".to_string());
                (drop / 0.3).min(1.0)
            } else if drop > 0.05 {
                reasons.push("vegetation index showing decline".to_string());
                drop / 0.15
            } else {
                0.0
            }
        }
        None if vegetation_now < 0.3 => {
            reasons.push("low vegetation index indicates poor vegetation health".to_string());
            0.8
        }
        None if vegetation_now < 0.5 => 0.4,
        None => 0.0,
    };

    let min_rain = thresholds.min_rainfall_7d;
    let water = if rain_7d_total == 0.0 {
        reasons.push("no rainfall in 7 days".to_string());
        1.0
    } else if rain_7d_total < min_rain {
        reasons.push(format!("low rainfall ({:.1}mm in 7 days)", rain_7d_total));
        ((min_rain - rain_7d_total) / min_rain).min(1.0)
    } else {
        0.0
    };

    let heat = if temp_7d_avg > thresholds.heat_stress_temp {
        reasons.push(format!("high temperature ({:.1}°C)", temp_7d_avg));
        ((temp_7d_avg - thresholds.heat_stress_temp) / 10.0).min(1.0)
    } else if temp_7d_avg < thresholds.optimal_temp_min {
        reasons.push(format!("low temperature ({:.1}°C)", temp_7d_avg));
        ((thresholds.optimal_temp_min - temp_7d_avg) / 10.0).min(0.5) * 0.5
    } else if temp_7d_avg > thresholds.optimal_temp_max {
        ((temp_7d_avg - thresholds.optimal_temp_max) / 5.0).min(0.5)
    } else {
        0.0
    };

    let score = (VEGETATION_WEIGHT * vegetation + WATER_WEIGHT * water + HEAT_WEIGHT * heat)
        .clamp(0.0, 100.0);

    if reasons.is_empty() {
        reasons.push("no significant stress detected".to_string());
    }

    StressAssessment {
        score,
        level: StressLevel::from_score(score),
        reasons,
        components: StressComponents {
            vegetation,
            water,
            heat,
        },
    }
}

/// Expand an assessment into a `grid_size` × `grid_size` grid of values in
/// [0, 1] around `score / 100` with uniform per-cell jitter.
pub fn synthesize_stress_grid<R: Rng + ?Sized>(
    assessment: &StressAssessment,
    grid_size: usize,
    rng: &mut R,
) -> Grid {
    let base = assessment.score / 100.0;
    (0..grid_size)
        .map(|_| {
            (0..grid_size)
                .map(|_| (base + rng.gen_range(-GRID_JITTER..=GRID_JITTER)).clamp(0.0, 1.0))
                .collect()
        })
        .collect()
}

/// Uniform grid used when no assessment could be computed
pub fn fallback_stress_grid(grid_size: usize) -> Grid {
    vec![vec![0.2; grid_size]; grid_size]
}

// ============================================================================
// Input derivation
// ============================================================================

/// Weather window feeding the scorer, in days before the end date
pub const WEATHER_WINDOW_DAYS: i64 = 7;
/// Vegetation window feeding the scorer, in days before the end date
pub const VEGETATION_WINDOW_DAYS: i64 = 14;

/// Scalar inputs of [`score_stress`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StressInputs {
    pub vegetation_now: f64,
    pub vegetation_prev14: Option<f64>,
    pub temp_7d_avg: f64,
    pub rain_7d_total: f64,
}

impl Default for StressInputs {
    fn default() -> Self {
        Self {
            vegetation_now: 0.6,
            vegetation_prev14: None,
            temp_7d_avg: 20.0,
            rain_7d_total: 15.0,
        }
    }
}

impl StressInputs {
    pub fn score(&self, profile: CropProfile) -> StressAssessment {
        score_stress(
            self.vegetation_now,
            self.vegetation_prev14,
            self.temp_7d_avg,
            self.rain_7d_total,
            profile,
        )
    }
}

/// Reduce raw series to scorer inputs.
///
/// Without a precipitation series the 7-day rainfall is estimated from the
/// mean temperature. The prior vegetation reading is the first point within
/// two days of `end - 14 days`.
pub fn derive_stress_inputs(
    weather: &[TimeSeriesPoint],
    precipitation: &[TimeSeriesPoint],
    vegetation: &[TimeSeriesPoint],
    end: NaiveDate,
) -> StressInputs {
    let mut inputs = StressInputs::default();

    let recent_temps = last_n(weather, WEATHER_WINDOW_DAYS as usize);
    if !recent_temps.is_empty() {
        inputs.temp_7d_avg =
            recent_temps.iter().map(|p| p.value).sum::<f64>() / recent_temps.len() as f64;
        inputs.rain_7d_total = if inputs.temp_7d_avg > 25.0 {
            5.0
        } else if inputs.temp_7d_avg < 15.0 {
            20.0
        } else {
            15.0
        };
    }

    if !precipitation.is_empty() {
        inputs.rain_7d_total = last_n(precipitation, WEATHER_WINDOW_DAYS as usize)
            .iter()
            .map(|p| p.value)
            .sum();
    }

    if vegetation.len() >= 2 {
        if let Some(last) = vegetation.last() {
            inputs.vegetation_now = last.value;
        }
        let target = end - Duration::days(VEGETATION_WINDOW_DAYS);
        inputs.vegetation_prev14 = vegetation
            .iter()
            .find(|point| {
                point
                    .day()
                    .is_some_and(|day| (day - target).num_days().abs() <= 2)
            })
            .map(|point| point.value);
    }

    inputs
}

fn last_n(points: &[TimeSeriesPoint], n: usize) -> &[TimeSeriesPoint] {
    &points[points.len().saturating_sub(n)..]
}
