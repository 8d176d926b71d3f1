pub mod classifier;
pub mod detector;
pub mod estimator;
pub mod intercept;
pub mod publish;
pub mod segmenter;
pub mod tracker;

pub use classifier::CellClassifier;
pub use detector::StormDetector;
pub use estimator::{
    build_estimator, AttributeEstimator, CellContext, CoupletThresholds, EstimatorKind,
    FixedEstimator, SeededEstimator, VelocityEstimator,
};
pub use intercept::{plan_intercept, InterceptPlanner};
pub use publish::{detect_blocking, run_pass, CellBoard, DetectionSnapshot};
pub use segmenter::{CellSegmenter, Region};
pub use tracker::{CellTracker, TrackedCell, TrackerConfig};
