use crate::processing::estimator::{AttributeEstimator, CellContext};
use crate::processing::segmenter::Region;
use crate::radar_interface::{Grid, StormCell};

/// Turns segmented regions into geo-located storm cells.
pub struct CellClassifier {
    estimator: Box<dyn AttributeEstimator>,
}

impl CellClassifier {
    pub fn new(estimator: Box<dyn AttributeEstimator>) -> Self {
        Self { estimator }
    }

    pub fn estimator_name(&self) -> &'static str {
        self.estimator.name()
    }

    /// One cell per region, numbered `CELL-1..` in region order.
    pub fn classify(&self, grid: &Grid, regions: &[Region]) -> Vec<StormCell> {
        regions
            .iter()
            .enumerate()
            .map(|(index, region)| {
                let (row, col) = region.centroid();
                let attributes = self.estimator.estimate(&CellContext {
                    index,
                    region,
                    grid,
                });
                StormCell::new(
                    format!("CELL-{}", index + 1),
                    grid.cell_to_geo(row, col),
                    region.peak_intensity().round() as i32,
                    region.pixel_count(),
                    attributes,
                    grid.captured_at(),
                )
            })
            .collect()
    }
}
