pub mod geo;
pub mod stats;

pub use geo::{GeoMath, GeoPoint};
pub use stats::StatsHelper;
