use crate::generator::scan::GeneratorConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use stormcore::processing::{CoupletThresholds, EstimatorKind, TrackerConfig};
use stormcore::radar_interface::ObserverState;
use stormcore::{DetectionConfig, InterceptConfig};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub generator: GeneratorConfig,
    pub scans: usize,
    pub detection: DetectionConfig,
    pub intercept: InterceptConfig,
    pub estimator: EstimatorKind,
    pub thresholds: CoupletThresholds,
    pub tracking: bool,
    pub tracker: TrackerConfig,
    pub observer: ObserverState,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        let generator = GeneratorConfig::default();
        let observer = ObserverState::new(generator.origin_lat, generator.origin_lon, 60.0);
        Self {
            generator,
            scans: 1,
            detection: DetectionConfig::default(),
            intercept: InterceptConfig::default(),
            estimator: EstimatorKind::default(),
            thresholds: CoupletThresholds::default(),
            tracking: true,
            tracker: TrackerConfig::default(),
            observer,
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config
            .validate()
            .with_context(|| format!("validating workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(scans: usize, seed: u64, threshold: f32, min_region_size: usize) -> Self {
        let defaults = Self::default();
        Self {
            generator: GeneratorConfig {
                seed,
                ..defaults.generator
            },
            scans,
            detection: DetectionConfig {
                threshold,
                min_region_size,
                ..defaults.detection
            },
            estimator: EstimatorKind::Velocity { seed: Some(seed) },
            ..defaults
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.detection.validate().context("detection settings")?;
        self.intercept.validate().context("intercept settings")?;
        self.tracker.validate().context("tracker settings")?;
        self.generator.validate().context("generator settings")?;
        anyhow::ensure!(self.scans > 0, "at least one scan is required");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_overrides_detection() {
        let cfg = WorkflowConfig::from_args(3, 42, 45.0, 12);
        assert_eq!(cfg.scans, 3);
        assert_eq!(cfg.generator.seed, 42);
        assert_eq!(cfg.detection.threshold, 45.0);
        assert_eq!(cfg.detection.min_region_size, 12);
        assert_eq!(cfg.estimator, EstimatorKind::Velocity { seed: Some(42) });
        cfg.validate().unwrap();
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"scans: 4\n\
              generator:\n  station_id: KFWS\n  seed: 9\n\
              detection:\n  threshold: 35.0\n\
              estimator:\n  kind: seeded\n  seed: 9\n\
              observer:\n  latitude: 32.5\n  longitude: -97.3\n  max_speed: 55.0\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.scans, 4);
        assert_eq!(cfg.generator.station_id, "KFWS");
        assert_eq!(cfg.generator.size, 100);
        assert_eq!(cfg.detection.threshold, 35.0);
        assert_eq!(cfg.detection.min_region_size, 10);
        assert_eq!(cfg.estimator, EstimatorKind::Seeded { seed: 9 });
        assert_eq!(cfg.observer.max_speed, 55.0);
    }

    #[test]
    fn config_load_rejects_invalid_intercept_window() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"intercept:\n  step_minutes: 0.0\n").unwrap();
        let path = temp.into_temp_path();
        assert!(WorkflowConfig::load(&path).is_err());
    }

    #[test]
    fn config_load_rejects_nan_smoothing() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"tracker:\n  smoothing: .nan\n").unwrap();
        let path = temp.into_temp_path();
        let err = WorkflowConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("smoothing"));
    }

    #[test]
    fn config_load_rejects_unbounded_generator() {
        for yaml in [
            "generator:\n  noise: -2147483648\n",
            "generator:\n  max_drift: .inf\n",
            "generator:\n  size: 100000\n",
            "generator:\n  storm_count: 1000000\n",
        ] {
            let mut temp = NamedTempFile::new().unwrap();
            temp.write_all(yaml.as_bytes()).unwrap();
            let path = temp.into_temp_path();
            assert!(WorkflowConfig::load(&path).is_err(), "{}", yaml);
        }
    }

    #[test]
    fn zero_scans_is_rejected() {
        let cfg = WorkflowConfig::from_args(0, 1, 40.0, 10);
        assert!(cfg.validate().is_err());
    }
}
