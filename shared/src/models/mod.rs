//! Domain models for the Field Analytics Platform

mod estimates;
mod farm;
mod geometry;
mod grid;
mod stress;
mod timeseries;

pub use estimates::*;
pub use farm::*;
pub use geometry::*;
pub use grid::*;
pub use stress::*;
pub use timeseries::*;
