//! WebAssembly module for the Field Analytics Platform
//!
//! Provides client-side computation for:
//! - Resampling vegetation rasters for display
//! - Crop stress scoring and stress grid previews
//! - Grid statistics
//! - Fallback field boundaries

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use shared::analytics::{
    anchor_for_field, grid_stats, resample, score_stress, synthesize_fallback_polygon,
    synthesize_stress_grid,
};
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    log("field analytics module loaded");
}

#[cfg(target_arch = "wasm32")]
fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

#[cfg(not(target_arch = "wasm32"))]
fn log(_message: &str) {}

fn parse_grid(grid_json: &str) -> Result<Grid, JsValue> {
    serde_json::from_str(grid_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid grid JSON: {}", e)))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization failed: {}", e)))
}

/// Block-average a JSON grid (array of rows) to `target_size` × `target_size`
#[wasm_bindgen]
pub fn resample_grid(grid_json: &str, target_size: usize) -> Result<String, JsValue> {
    let grid = parse_grid(grid_json)?;
    to_json(&resample(&grid, target_size))
}

/// Mean, median, min and max over the unmasked cells of a JSON grid
#[wasm_bindgen]
pub fn vegetation_grid_stats(grid_json: &str) -> Result<String, JsValue> {
    let grid = parse_grid(grid_json)?;
    to_json(&grid_stats(&grid))
}

/// Score crop stress; returns the assessment as JSON
#[wasm_bindgen]
pub fn score_crop_stress(
    vegetation_now: f64,
    vegetation_prev14: Option<f64>,
    temp_7d_avg: f64,
    rain_7d_total: f64,
    crop: &str,
) -> Result<String, JsValue> {
    let assessment = score_stress(
        vegetation_now,
        vegetation_prev14,
        temp_7d_avg,
        rain_7d_total,
        CropProfile::from_name(crop),
    );
    to_json(&assessment)
}

/// Severity band of a stress score
#[wasm_bindgen]
pub fn classify_stress_level(score: f64) -> String {
    StressLevel::from_score(score).to_string()
}

/// Reproducible stress grid around `score` for previews
#[wasm_bindgen]
pub fn synthesize_stress_grid_seeded(score: f64, grid_size: usize, seed: u32) -> Result<String, JsValue> {
    let assessment = StressAssessment {
        score: score.clamp(0.0, 100.0),
        level: StressLevel::from_score(score),
        reasons: Vec::new(),
        components: StressComponents::default(),
    };
    let mut rng = StdRng::seed_from_u64(u64::from(seed));
    to_json(&synthesize_stress_grid(&assessment, grid_size, &mut rng))
}

/// Square boundary around the farm embedded in `field_id`, as GeoJSON
#[wasm_bindgen]
pub fn fallback_field_polygon(field_id: &str, half_width_deg: f64) -> Result<String, JsValue> {
    to_json(&synthesize_fallback_polygon(
        anchor_for_field(field_id),
        half_width_deg,
    ))
}
