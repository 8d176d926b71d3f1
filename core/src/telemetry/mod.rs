pub mod log;
pub mod metrics;

pub use log::{EventRecord, LogManager};
pub use metrics::{Metrics, MetricsRecorder};
