//! Crop stress models

use serde::{Deserialize, Serialize};

use super::grid::GridData;

/// Severity band of a stress score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum StressLevel {
    /// score < 40
    Low,
    /// 40 <= score < 70
    Medium,
    /// score >= 70
    High,
}

impl StressLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            StressLevel::High
        } else if score >= 40.0 {
            StressLevel::Medium
        } else {
            StressLevel::Low
        }
    }
}

impl std::fmt::Display for StressLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StressLevel::Low => write!(f, "LOW"),
            StressLevel::Medium => write!(f, "MEDIUM"),
            StressLevel::High => write!(f, "HIGH"),
        }
    }
}

/// Per-factor contributions, each in [0, 1]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct StressComponents {
    pub vegetation: f64,
    pub water: f64,
    pub heat: f64,
}

/// Result of scoring one field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StressAssessment {
    pub score: f64,
    pub level: StressLevel,
    pub reasons: Vec<String>,
    pub components: StressComponents,
}

impl StressAssessment {
    /// Assessment served when the pipeline cannot produce a real one
    pub fn fallback() -> Self {
        Self {
            score: 20.0,
            level: StressLevel::Low,
            reasons: vec!["calculation error, using default".to_string()],
            components: StressComponents::default(),
        }
    }
}

/// Stress grid plus the assessment it was synthesized from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressIndex {
    pub field_id: String,
    pub timestamp: String,
    pub grid: GridData,
    pub stress_score: f64,
    pub level: StressLevel,
    pub reasons: Vec<String>,
    pub components: StressComponents,
}

/// Agronomic thresholds of a crop
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CropThresholds {
    /// Lower bound of the optimal temperature band, °C
    pub optimal_temp_min: f64,
    /// Upper bound of the optimal temperature band, °C
    pub optimal_temp_max: f64,
    /// Temperature above which heat stress sets in, °C
    pub heat_stress_temp: f64,
    /// Minimum rainfall over 7 days, mm
    pub min_rainfall_7d: f64,
}

/// Supported crop profiles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum CropProfile {
    Canola,
    #[serde(rename = "Timothy Hay")]
    TimothyHay,
    #[default]
    Default,
}

impl CropProfile {
    /// Resolve a crop name; unknown names map to [`CropProfile::Default`]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().replace(['_', '-'], " ").as_str() {
            "canola" => CropProfile::Canola,
            "timothy hay" => CropProfile::TimothyHay,
            _ => CropProfile::Default,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CropProfile::Canola => "Canola",
            CropProfile::TimothyHay => "Timothy Hay",
            CropProfile::Default => "Default",
        }
    }

    pub fn thresholds(&self) -> CropThresholds {
        match self {
            CropProfile::Canola => CropThresholds {
                optimal_temp_min: 10.0,
                optimal_temp_max: 25.0,
                heat_stress_temp: 30.0,
                min_rainfall_7d: 10.0,
            },
            CropProfile::TimothyHay => CropThresholds {
                optimal_temp_min: 15.0,
                optimal_temp_max: 28.0,
                heat_stress_temp: 32.0,
                min_rainfall_7d: 15.0,
            },
            CropProfile::Default => CropThresholds {
                optimal_temp_min: 12.0,
                optimal_temp_max: 26.0,
                heat_stress_temp: 30.0,
                min_rainfall_7d: 12.0,
            },
        }
    }
}

impl std::fmt::Display for CropProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
