//! Headline KPI aggregation

use crate::models::{KpiIndicators, TimeSeriesPoint};

const DEFAULT_PRODUCTIVITY: f64 = 20.0;
const DEFAULT_WATER_EFFICIENCY: f64 = 25.0;

/// Combine the environmental series into the three headline indicators.
///
/// `vegetation` is `None` when no field was named in the request; it then
/// costs the ESG score the same as an empty series.
pub fn aggregate_kpis(
    weather: &[TimeSeriesPoint],
    soil: &[TimeSeriesPoint],
    vegetation: Option<&[TimeSeriesPoint]>,
) -> KpiIndicators {
    let vegetation = vegetation.unwrap_or(&[]);

    KpiIndicators {
        productivity_delta: productivity(weather, vegetation),
        water_efficiency: water_efficiency(soil),
        esg_score: esg_score(weather, soil, vegetation),
    }
}

fn productivity(weather: &[TimeSeriesPoint], vegetation: &[TimeSeriesPoint]) -> f64 {
    if let [first, .., last] = vegetation {
        let delta = (last.value - first.value) * 100.0;
        return (15.0 + delta * 10.0).clamp(0.0, 50.0);
    }

    match weather {
        [first, .., last] if (15.0..=25.0).contains(&last.value) => {
            20.0 + (last.value - first.value) * 0.5
        }
        [_, .., _] => 15.0,
        _ => DEFAULT_PRODUCTIVITY,
    }
}

fn water_efficiency(soil: &[TimeSeriesPoint]) -> f64 {
    if soil.is_empty() {
        return DEFAULT_WATER_EFFICIENCY;
    }
    let mean = soil.iter().map(|p| p.value).sum::<f64>() / soil.len() as f64;
    if (30.0..=60.0).contains(&mean) {
        30.0
    } else if mean < 30.0 {
        20.0
    } else {
        25.0
    }
}

fn esg_score(
    weather: &[TimeSeriesPoint],
    soil: &[TimeSeriesPoint],
    vegetation: &[TimeSeriesPoint],
) -> f64 {
    let penalty = |present: bool, when_present: f64, when_absent: f64| {
        if present {
            when_present
        } else {
            when_absent
        }
    };

    let score = 100.0
        - penalty(!weather.is_empty(), 5.0, 20.0)
        - penalty(!soil.is_empty(), 5.0, 20.0)
        - penalty(!vegetation.is_empty(), 5.0, 10.0);
    score.clamp(70.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<TimeSeriesPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| TimeSeriesPoint::new(format!("2024-06-{:02}T00:00:00", i + 1), *v))
            .collect()
    }

    #[test]
    fn test_all_sources_present() {
        let kpi = aggregate_kpis(
            &series(&[18.0, 20.0]),
            &series(&[45.0, 50.0]),
            Some(&series(&[0.5, 0.52])),
        );
        assert_eq!(kpi.esg_score, 85.0);
        assert_eq!(kpi.water_efficiency, 30.0);
        assert!((kpi.productivity_delta - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_sources_absent() {
        let kpi = aggregate_kpis(&[], &[], None);
        assert_eq!(kpi.esg_score, 70.0);
        assert_eq!(kpi.productivity_delta, 20.0);
        assert_eq!(kpi.water_efficiency, 25.0);
    }

    #[test]
    fn test_vegetation_trend_is_clamped() {
        let up = aggregate_kpis(&[], &[], Some(&series(&[0.2, 0.8])));
        assert_eq!(up.productivity_delta, 50.0);
        let down = aggregate_kpis(&[], &[], Some(&series(&[0.8, 0.2])));
        assert_eq!(down.productivity_delta, 0.0);
    }

    #[test]
    fn test_weather_trend_fallbacks() {
        let mild = aggregate_kpis(&series(&[16.0, 20.0]), &[], None);
        assert_eq!(mild.productivity_delta, 22.0);
        let hot = aggregate_kpis(&series(&[16.0, 30.0]), &[], None);
        assert_eq!(hot.productivity_delta, 15.0);
        let single = aggregate_kpis(&series(&[30.0]), &[], None);
        assert_eq!(single.productivity_delta, 20.0);
    }

    #[test]
    fn test_water_efficiency_bands() {
        assert_eq!(aggregate_kpis(&[], &series(&[10.0]), None).water_efficiency, 20.0);
        assert_eq!(aggregate_kpis(&[], &series(&[75.0]), None).water_efficiency, 25.0);
    }
}
