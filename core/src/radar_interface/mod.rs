pub mod grid;
pub mod intercept;
pub mod storm_cell;

pub use grid::{Grid, GridGeometry, GridPayload, ProductKind, ScanMetadata};
pub use intercept::{InterceptResult, ObserverState};
pub use storm_cell::{HazardAttributes, StormCell};
