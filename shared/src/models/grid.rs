//! Raster grids and their API representations

use serde::{Deserialize, Serialize};

use super::geometry::BoundingBox;

/// Row-major 2D grid. A cell equal to exactly 0.0 means masked/no-data.
pub type Grid = Vec<Vec<f64>>;

/// Grid with its spatial extent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridData {
    pub resolution: f64,
    pub bounds: BoundingBox,
    pub values: Grid,
}

/// Raw raster produced by a vegetation source, before resampling
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    /// Ground resolution in metres per cell
    pub resolution: f64,
    pub bounds: BoundingBox,
    pub values: Grid,
}

/// Summary statistics over the unmasked cells of a grid
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct GridStats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Vegetation index grid for one field
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NdviGrid {
    pub field_id: String,
    pub timestamp: String,
    pub grid: GridData,
    pub stats: GridStats,
}
