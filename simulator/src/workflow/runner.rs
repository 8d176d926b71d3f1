use crate::generator::scan::{ScanGenerator, ScanPair};
use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use stormcore::processing::{build_estimator, CellTracker, InterceptPlanner, StormDetector};
use stormcore::radar_interface::{Grid, InterceptResult, StormCell};
use stormcore::telemetry::{LogManager, Metrics, MetricsRecorder};

/// Intercept plan for one cell; `None` when no candidate time is reachable.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedIntercept {
    pub cell_id: String,
    pub plan: Option<InterceptResult>,
}

/// Everything produced by one detection cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub station_id: String,
    pub captured_at: DateTime<Utc>,
    pub cells: Vec<StormCell>,
    pub intercepts: Vec<PlannedIntercept>,
}

impl CycleReport {
    pub fn reachable(&self) -> usize {
        self.intercepts
            .iter()
            .filter(|intercept| intercept.plan.is_some())
            .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub cycles: Vec<CycleReport>,
    pub metrics: Metrics,
}

impl WorkflowResult {
    pub fn detection_count(&self) -> usize {
        self.cycles.iter().map(|cycle| cycle.cells.len()).sum()
    }
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
    planner: InterceptPlanner,
    metrics: Arc<MetricsRecorder>,
    tracker: Option<Arc<Mutex<CellTracker>>>,
    logger: LogManager,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> anyhow::Result<Self> {
        config.validate().context("validating workflow config")?;
        let tracker = config
            .tracking
            .then(|| Arc::new(Mutex::new(CellTracker::new(config.tracker))));
        Ok(Self {
            planner: InterceptPlanner::new(config.intercept),
            metrics: Arc::new(MetricsRecorder::new()),
            tracker,
            logger: LogManager::new(),
            config,
        })
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics.snapshot()
    }

    /// Runs the configured number of cycles over freshly generated scans.
    pub fn execute(&self, generator: &mut ScanGenerator) -> anyhow::Result<WorkflowResult> {
        let mut cycles = Vec::with_capacity(self.config.scans);
        for index in 0..self.config.scans {
            let scan = generator
                .next_scan()
                .with_context(|| format!("generating scan {}", index))?;
            let report = self
                .run_cycle(&scan)
                .with_context(|| format!("running detection cycle {}", index))?;
            cycles.push(report);
        }
        Ok(WorkflowResult {
            cycles,
            metrics: self.metrics(),
        })
    }

    /// One cycle over a reflectivity scan and its paired velocity scan.
    pub fn run_cycle(&self, scan: &ScanPair) -> anyhow::Result<CycleReport> {
        self.cycle(&scan.reflectivity, Some(scan.velocity.clone()))
    }

    /// One cycle over an externally supplied reflectivity scan.
    pub fn ingest(&self, grid: &Grid) -> anyhow::Result<CycleReport> {
        self.cycle(grid, None)
    }

    fn cycle(&self, grid: &Grid, velocity: Option<Grid>) -> anyhow::Result<CycleReport> {
        let estimator = build_estimator(&self.config.estimator, velocity, self.config.thresholds);
        let detector = StormDetector::new(self.config.detection.clone(), estimator)
            .context("building storm detector")?
            .with_metrics(self.metrics.clone());

        let mut cells = detector.detect(grid);
        if let Some(tracker) = &self.tracker {
            let mut tracker = tracker
                .lock()
                .map_err(|_| anyhow::anyhow!("cell tracker lock poisoned"))?;
            if tracker.is_stale(grid.captured_at()) {
                log::warn!(
                    "{} {} predates the tracked scans, skipping tracking",
                    grid.station_id(),
                    grid.captured_at().to_rfc3339()
                );
            } else {
                cells = tracker.update(&cells);
            }
        }

        let mut intercepts = Vec::with_capacity(cells.len());
        for cell in &cells {
            self.logger.log_storm_cell(cell);
            let plan = self.planner.plan(&self.config.observer, cell);
            if let Some(result) = &plan {
                self.logger.log_intercept(cell, result);
            }
            intercepts.push(PlannedIntercept {
                cell_id: cell.id.clone(),
                plan,
            });
        }

        let report = CycleReport {
            station_id: grid.station_id().to_string(),
            captured_at: grid.captured_at(),
            cells,
            intercepts,
        };
        log::info!(
            "{} {}: {} cells, {} reachable",
            report.station_id,
            report.captured_at.to_rfc3339(),
            report.cells.len(),
            report.reachable()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::scan::GeneratorConfig;
    use chrono::TimeZone;
    use stormcore::processing::EstimatorKind;
    use stormcore::radar_interface::{GridGeometry, ProductKind, ScanMetadata};

    fn config(scans: usize) -> WorkflowConfig {
        let mut cfg = WorkflowConfig::from_args(scans, 21, 40.0, 10);
        cfg.generator = GeneratorConfig {
            seed: 21,
            storm_count: Some(3),
            start: Some(Utc.with_ymd_and_hms(2024, 5, 20, 21, 0, 0).unwrap()),
            ..Default::default()
        };
        cfg
    }

    fn storm_scan(minute: u32) -> Grid {
        let metadata = ScanMetadata {
            station_id: "KTLX".into(),
            product_kind: ProductKind::Reflectivity,
            captured_at: Utc.with_ymd_and_hms(2024, 5, 20, 21, minute, 0).unwrap(),
            origin_lat: 35.3331,
            origin_lon: -97.2778,
        };
        let mut cells = vec![vec![None; 30]; 30];
        for row in cells.iter_mut().skip(10).take(5) {
            for cell in row.iter_mut().skip(10).take(5) {
                *cell = Some(55.0);
            }
        }
        Grid::new(metadata, cells, GridGeometry::default()).unwrap()
    }

    #[test]
    fn runner_executes_workflow() {
        let cfg = config(3);
        let runner = Runner::new(cfg.clone()).unwrap();
        let mut generator = ScanGenerator::new(cfg.generator.clone());
        let result = runner.execute(&mut generator).unwrap();

        assert_eq!(result.cycles.len(), 3);
        assert_eq!(result.metrics.passes, 3);
        assert_eq!(result.metrics.cells, result.detection_count());
        for cycle in &result.cycles {
            assert_eq!(cycle.cells.len(), cycle.intercepts.len());
            for (cell, intercept) in cycle.cells.iter().zip(&cycle.intercepts) {
                assert!(cell.id.starts_with("STORM-"));
                assert_eq!(cell.id, intercept.cell_id);
            }
        }
    }

    #[test]
    fn untracked_cycles_keep_pass_local_ids() {
        let mut cfg = config(1);
        cfg.tracking = false;
        cfg.estimator = EstimatorKind::Fixed;
        let runner = Runner::new(cfg.clone()).unwrap();
        let mut generator = ScanGenerator::new(cfg.generator.clone());
        let result = runner.execute(&mut generator).unwrap();
        for (index, cell) in result.cycles[0].cells.iter().enumerate() {
            assert_eq!(cell.id, format!("CELL-{}", index + 1));
            assert_eq!(cell.movement_speed, 0.0);
        }
    }

    #[test]
    fn ingest_runs_without_a_velocity_scan() {
        let cfg = config(1);
        let runner = Runner::new(cfg.clone()).unwrap();
        let mut generator = ScanGenerator::new(cfg.generator.clone());
        let scan = generator.next_scan().unwrap();
        let report = runner.ingest(&scan.reflectivity).unwrap();
        assert_eq!(report.station_id, "KTLX");
        assert_eq!(report.captured_at, scan.reflectivity.captured_at());
    }

    #[test]
    fn older_ingested_scan_leaves_tracks_alone() {
        let mut cfg = config(1);
        cfg.estimator = EstimatorKind::Fixed;
        let runner = Runner::new(cfg).unwrap();
        let older = storm_scan(0);
        let newer = storm_scan(5);

        let current = runner.ingest(&newer).unwrap();
        assert_eq!(current.cells.len(), 1);
        assert!(current.cells.iter().all(|cell| cell.id.starts_with("STORM-")));

        let tracker = runner.tracker.as_ref().unwrap();
        let (tracks_before, last_before) = {
            let guard = tracker.lock().unwrap();
            let ids: Vec<String> = guard.tracks().iter().map(|track| track.id.clone()).collect();
            (ids, guard.last_scan())
        };
        assert_eq!(last_before, Some(newer.captured_at()));

        let late = runner.ingest(&older).unwrap();
        assert_eq!(late.cells.len(), 1);
        assert_eq!(late.cells[0].id, "CELL-1");

        let guard = tracker.lock().unwrap();
        let tracks_after: Vec<String> = guard.tracks().iter().map(|track| track.id.clone()).collect();
        assert_eq!(tracks_after, tracks_before);
        assert!(guard.tracks().iter().all(|track| track.scans_since_seen == 0));
        assert_eq!(guard.last_scan(), last_before);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = config(1);
        cfg.detection.min_region_size = 0;
        assert!(Runner::new(cfg).is_err());

        let mut cfg = config(1);
        cfg.tracker.smoothing = f64::NAN;
        assert!(Runner::new(cfg).is_err());
    }
}
