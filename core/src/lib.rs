//! Storm-cell detection and intercept planning for the Rust weather terminal.
//!
//! A scan grid is segmented into connected high-reflectivity regions, each
//! region is classified into a geo-located storm cell, and the planner answers
//! whether a mobile observer can reach a moving cell within a search horizon.

pub mod math;
pub mod prelude;
pub mod processing;
pub mod radar_interface;
pub mod telemetry;

pub use prelude::{
    DetectionConfig, DetectionError, DetectionResult, InterceptConfig, MAX_INTERCEPT_CANDIDATES,
};
pub use processing::{plan_intercept, StormDetector};
pub use radar_interface::{Grid, InterceptResult, ObserverState, StormCell};
