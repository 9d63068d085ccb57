//! Property-based tests for the derived-metric pipeline
//!
//! - Resampler shape and masking
//! - Stress score range and level boundaries
//! - Yield/carbon series length and confidence
//! - KPI ESG bounds
//! - Fallback geometry

use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use shared::analytics::{
    aggregate_kpis, estimate_carbon, estimate_yield, resample, resolve_bounds, resolve_center,
    score_stress, synthesize_fallback_polygon, synthesize_stress_grid,
};
use shared::{CropProfile, DailySeries, DateRange, LatLng, StressLevel, TimeSeriesPoint};

// ============================================================================
// Property Test Strategies
// ============================================================================

fn crop_strategy() -> impl Strategy<Value = CropProfile> {
    prop_oneof![
        Just(CropProfile::Canola),
        Just(CropProfile::TimothyHay),
        Just(CropProfile::Default),
    ]
}

/// Rectangular grid with a mix of masked and unmasked cells
fn grid_strategy() -> impl Strategy<Value = Vec<Vec<f64>>> {
    (1usize..150, 1usize..150).prop_flat_map(|(rows, cols)| {
        prop::collection::vec(
            prop::collection::vec(prop_oneof![Just(0.0), 0.01f64..1.0], cols),
            rows,
        )
    })
}

fn date_range_strategy() -> impl Strategy<Value = DateRange> {
    (0i64..3000, 0i64..120).prop_map(|(offset, len)| {
        let start = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap() + Duration::days(offset);
        DateRange::new(start, start + Duration::days(len)).unwrap()
    })
}

fn series_strategy() -> impl Strategy<Value = Vec<TimeSeriesPoint>> {
    prop::collection::vec(-30.0f64..45.0, 0..10).prop_map(|values| {
        values
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap() + Duration::days(i as i64);
                TimeSeriesPoint::daily(day, v)
            })
            .collect()
    })
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn test_end_to_end_stress_example() {
    let result = score_stress(0.4, Some(0.6), 32.0, 0.0, CropProfile::Default);
    assert_relative_eq!(result.score, 62.666_666_666_666_67, epsilon = 1e-9);
    assert_eq!(result.level, StressLevel::Medium);
    assert_eq!((result.score * 10.0).round() / 10.0, 62.7);
}

#[test]
fn test_resampler_leaves_unmasked_same_size_grid_unchanged() {
    let grid: Vec<Vec<f64>> = (0..64)
        .map(|r| (0..64).map(|c| 0.1 + (r * 64 + c) as f64 / 10_000.0).collect())
        .collect();
    assert_eq!(resample(&grid, 64), grid);
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The resampler always produces target_size × target_size cells, each
    /// either masked or within the range of the input values.
    #[test]
    fn prop_resample_shape_and_range(grid in grid_strategy(), target in 1usize..80) {
        let out = resample(&grid, target);
        prop_assert_eq!(out.len(), target);
        for row in &out {
            prop_assert_eq!(row.len(), target);
            for value in row {
                prop_assert!(*value == 0.0 || (0.0099..=1.0001).contains(value));
            }
        }
    }

    /// All-masked input resamples to all-masked output
    #[test]
    fn prop_resample_all_zero(rows in 0usize..100, cols in 0usize..100, target in 1usize..70) {
        let out = resample(&vec![vec![0.0; cols]; rows], target);
        prop_assert!(out.iter().flatten().all(|v| *v == 0.0));
    }

    /// Scores stay in [0, 100] and the level agrees with the score
    #[test]
    fn prop_stress_score_bounded(
        now in -1.0f64..1.0,
        prev in proptest::option::of(-1.0f64..1.0),
        temp in -40.0f64..60.0,
        rain in 0.0f64..200.0,
        crop in crop_strategy(),
    ) {
        let result = score_stress(now, prev, temp, rain, crop);
        prop_assert!((0.0..=100.0).contains(&result.score));
        prop_assert_eq!(result.level, StressLevel::from_score(result.score));
        prop_assert!(!result.reasons.is_empty());
        for component in [result.components.vegetation, result.components.water, result.components.heat] {
            prop_assert!((0.0..=1.0).contains(&component));
        }
    }

    /// Zero rainfall always saturates the water component
    #[test]
    fn prop_no_rain_means_full_water_stress(now in 0.0f64..1.0, temp in -10.0f64..40.0, crop in crop_strategy()) {
        let result = score_stress(now, None, temp, 0.0, crop);
        prop_assert_eq!(result.components.water, 1.0);
        prop_assert!(result.reasons.iter().any(|r| r == "no rainfall in 7 days"));
    }

    /// Synthesized grids are bounded and seed-reproducible
    #[test]
    fn prop_stress_grid_bounded(score in 0.0f64..=100.0, size in 1usize..32, seed in any::<u64>()) {
        let mut assessment = score_stress(0.6, None, 20.0, 20.0, CropProfile::Default);
        assessment.score = score;
        let grid = synthesize_stress_grid(&assessment, size, &mut StdRng::seed_from_u64(seed));
        let again = synthesize_stress_grid(&assessment, size, &mut StdRng::seed_from_u64(seed));
        prop_assert_eq!(&grid, &again);
        prop_assert!(grid.iter().flatten().all(|v| (0.0..=1.0).contains(v)));
    }

    /// Yield and carbon series hold one point per day of the range
    #[test]
    fn prop_series_length_matches_range(
        range in date_range_strategy(),
        temps in series_strategy(),
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let temperature = DailySeries::from_points(&temps);
        let empty = DailySeries::default();

        let yields = estimate_yield("field-1", &temperature, &empty, &empty, range, &mut rng);
        let carbon = estimate_carbon("field-1", &temperature, &empty, range, &mut rng);

        prop_assert_eq!(yields.len(), range.day_count());
        prop_assert_eq!(carbon.len(), range.day_count());
        prop_assert!(yields.iter().all(|p| p.value >= 0.0));
        prop_assert!(carbon.iter().all(|p| p.value >= 0.0));
    }

    /// Confidence never decreases when another series gains data
    #[test]
    fn prop_confidence_monotone(points in series_strategy().prop_filter("non-empty", |s| !s.is_empty())) {
        let range = DateRange::trailing(NaiveDate::from_ymd_opt(2024, 6, 5).unwrap(), 3);
        let with = DailySeries::from_points(&points);
        let without = DailySeries::default();
        let mut rng = StdRng::seed_from_u64(0);

        let c0 = estimate_yield("f", &without, &without, &without, range, &mut rng)[0].confidence;
        let c1 = estimate_yield("f", &with, &without, &without, range, &mut rng)[0].confidence;
        let c2 = estimate_yield("f", &with, &with, &without, range, &mut rng)[0].confidence;
        let c3 = estimate_yield("f", &with, &with, &with, range, &mut rng)[0].confidence;
        prop_assert!(c0 <= c1 && c1 <= c2 && c2 <= c3);
        prop_assert!(c3 <= 0.95);
    }

    /// ESG stays within [70, 100] for any combination of inputs
    #[test]
    fn prop_esg_bounded(weather in series_strategy(), soil in series_strategy(), veg in proptest::option::of(series_strategy())) {
        let kpi = aggregate_kpis(&weather, &soil, veg.as_deref());
        prop_assert!((70.0..=100.0).contains(&kpi.esg_score));
        prop_assert!((0.0..=50.0).contains(&kpi.productivity_delta));
    }

    /// Fallback squares are closed and centred on their anchor
    #[test]
    fn prop_fallback_polygon(lat in -80.0f64..80.0, lng in -170.0f64..170.0, half in 0.0001f64..1.0) {
        let polygon = synthesize_fallback_polygon(LatLng::new(lat, lng), half);
        let ring = polygon.exterior();
        prop_assert_eq!(ring.len(), 5);
        prop_assert_eq!(ring[0], ring[4]);

        let bounds = resolve_bounds(&polygon);
        prop_assert!((bounds.north - (lat + half)).abs() < 1e-9);
        prop_assert!((bounds.west - (lng - half)).abs() < 1e-9);

        let center = resolve_center(&polygon);
        prop_assert!((center.lat - lat).abs() < 1e-9);
        prop_assert!((center.lng - lng).abs() < 1e-9);
    }
}
