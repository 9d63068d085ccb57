//! Derived-metric pipeline
//!
//! Every function here is pure apart from the injected random source, so
//! the same code runs in the backend and in the browser.

pub mod carbon;
pub mod geometry;
pub mod grid;
pub mod kpi;
pub mod stress;
pub mod yield_prediction;

pub use carbon::{estimate_carbon, fallback_carbon_series};
pub use geometry::{
    anchor_for_field, contains_point, embedded_id, farm_anchor, resolve_bounds, resolve_center,
    resolve_field_polygon, synthesize_fallback_polygon, DEFAULT_HALF_WIDTH_DEG,
};
pub use grid::{grid_stats, resample, VISUALIZATION_GRID_SIZE};
pub use kpi::aggregate_kpis;
pub use stress::{
    derive_stress_inputs, fallback_stress_grid, score_stress, synthesize_stress_grid,
    StressInputs,
};
pub use yield_prediction::{estimate_yield, fallback_yield_series};

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
