use crate::prelude::{DetectionConfig, DetectionResult};
use crate::processing::classifier::CellClassifier;
use crate::processing::estimator::AttributeEstimator;
use crate::processing::segmenter::CellSegmenter;
use crate::radar_interface::{Grid, GridPayload, ProductKind, StormCell};
use crate::telemetry::log::LogManager;
use crate::telemetry::metrics::MetricsRecorder;
use std::sync::Arc;

/// Full detection pass: segment a scan, then classify its regions.
pub struct StormDetector {
    segmenter: CellSegmenter,
    classifier: CellClassifier,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl StormDetector {
    pub fn new(
        config: DetectionConfig,
        estimator: Box<dyn AttributeEstimator>,
    ) -> DetectionResult<Self> {
        config.validate()?;
        Ok(Self {
            segmenter: CellSegmenter::new(config),
            classifier: CellClassifier::new(estimator),
            metrics: Arc::new(MetricsRecorder::new()),
            logger: LogManager::new(),
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &DetectionConfig {
        self.segmenter.config()
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.metrics
    }

    /// The complete cell list for one scan; nothing is handed out mid-pass.
    pub fn detect(&self, grid: &Grid) -> Vec<StormCell> {
        if grid.product_kind() != ProductKind::Reflectivity {
            log::warn!(
                "{} detection running on a {:?} scan; hail probability assumes dBZ",
                grid.station_id(),
                grid.product_kind()
            );
        }

        let regions = self.segmenter.segment(grid);
        let cells = self.classifier.classify(grid, &regions);

        self.metrics.record_pass(cells.len());
        self.logger.record(&format!(
            "{} {} -> {} cells ({} estimator)",
            grid.station_id(),
            grid.captured_at().to_rfc3339(),
            cells.len(),
            self.classifier.estimator_name()
        ));
        cells
    }

    /// Validates a raw payload before detecting; a malformed grid fails
    /// only this pass.
    pub fn detect_payload(&self, payload: GridPayload) -> DetectionResult<Vec<StormCell>> {
        match Grid::try_from(payload) {
            Ok(grid) => Ok(self.detect(&grid)),
            Err(err) => {
                self.metrics.record_rejected();
                log::warn!("skipping scan cycle: {}", err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::DetectionError;
    use crate::processing::estimator::FixedEstimator;
    use crate::processing::segmenter::tests::{blank, grid, stamp};
    use crate::radar_interface::grid::tests::metadata;
    use crate::radar_interface::GridGeometry;

    fn detector() -> StormDetector {
        StormDetector::new(
            DetectionConfig::default(),
            Box::new(FixedEstimator::default()),
        )
        .unwrap()
    }

    #[test]
    fn detection_counts_passes_and_cells() {
        let mut cells = blank(20, 20);
        stamp(&mut cells, 2, 2, 4, 50.0);
        stamp(&mut cells, 10, 10, 4, 58.0);
        let detector = detector();
        let storm_cells = detector.detect(&grid(cells));
        assert_eq!(storm_cells.len(), 2);
        assert_eq!(detector.metrics().snapshot().passes, 1);
        assert_eq!(detector.metrics().snapshot().cells, 2);
    }

    #[test]
    fn ragged_payload_is_rejected_and_counted() {
        let detector = detector();
        let payload = GridPayload {
            metadata: metadata(ProductKind::Reflectivity),
            geometry: GridGeometry::default(),
            cells: vec![vec![Some(50.0); 4], vec![Some(50.0); 3]],
        };
        let err = detector.detect_payload(payload).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidGrid(_)));
        assert_eq!(detector.metrics().snapshot().rejected_grids, 1);
        assert_eq!(detector.metrics().snapshot().passes, 0);
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = DetectionConfig {
            min_region_size: 0,
            ..Default::default()
        };
        assert!(StormDetector::new(config, Box::new(FixedEstimator::default())).is_err());
    }
}
