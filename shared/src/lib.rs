//! Shared types and analytics for the Field Analytics Platform
//!
//! This crate contains the data model and the derived-metric pipeline shared
//! between the backend and the frontend (via WASM).

pub mod analytics;
pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use error::AnalyticsError;
pub use models::*;
pub use types::*;
pub use validation::*;
