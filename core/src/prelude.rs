use serde::{Deserialize, Serialize};

/// Shared configuration for a detection pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum intensity for a grid cell to join a region.
    pub threshold: f32,
    /// Regions with fewer pixels than this are discarded.
    pub min_region_size: usize,
    /// Values above this ceiling are treated as no-data.
    pub max_valid_intensity: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: 40.0,
            min_region_size: 10,
            max_valid_intensity: 100.0,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> DetectionResult<()> {
        if !self.threshold.is_finite() {
            return Err(DetectionError::InvalidConfig(
                "threshold must be finite".into(),
            ));
        }
        if self.min_region_size == 0 {
            return Err(DetectionError::InvalidConfig(
                "min_region_size must be at least 1".into(),
            ));
        }
        if self.max_valid_intensity.is_nan() || self.max_valid_intensity < self.threshold {
            return Err(DetectionError::InvalidConfig(format!(
                "max_valid_intensity {} is below threshold {}",
                self.max_valid_intensity, self.threshold
            )));
        }
        Ok(())
    }
}

/// Largest number of candidate times a single intercept search may examine.
pub const MAX_INTERCEPT_CANDIDATES: usize = 100_000;

/// Search window for the intercept planner.
///
/// The step is part of the observable contract: a coarser step thins the
/// candidate set and shifts the reported intercept time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct InterceptConfig {
    pub horizon_minutes: f64,
    pub step_minutes: f64,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            horizon_minutes: 120.0,
            step_minutes: 5.0,
        }
    }
}

impl InterceptConfig {
    pub fn validate(&self) -> DetectionResult<()> {
        if !(self.step_minutes.is_finite() && self.step_minutes > 0.0) {
            return Err(DetectionError::InvalidConfig(format!(
                "step_minutes must be positive, got {}",
                self.step_minutes
            )));
        }
        if !(self.horizon_minutes.is_finite() && self.horizon_minutes >= 0.0) {
            return Err(DetectionError::InvalidConfig(format!(
                "horizon_minutes must be non-negative, got {}",
                self.horizon_minutes
            )));
        }
        if self.step_ratio() >= MAX_INTERCEPT_CANDIDATES as f64 {
            return Err(DetectionError::InvalidConfig(format!(
                "horizon {} over step {} exceeds {} candidates",
                self.horizon_minutes, self.step_minutes, MAX_INTERCEPT_CANDIDATES
            )));
        }
        Ok(())
    }

    /// Number of candidate times examined, including `t = 0`.
    ///
    /// A horizon that is a whole number of steps keeps its final sample even
    /// when the division lands a rounding error short, as with 0.7 / 0.1.
    pub fn candidate_count(&self) -> usize {
        if self.validate().is_err() {
            return 0;
        }
        self.step_ratio().floor() as usize + 1
    }

    fn step_ratio(&self) -> f64 {
        self.horizon_minutes / self.step_minutes * (1.0 + 1e-9)
    }
}

/// Common error type for the detection core.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type DetectionResult<T> = Result<T, DetectionError>;
