use crate::workflow::runner::{CycleReport, PlannedIntercept};
use chrono::{DateTime, Utc};
use serde::Serialize;
use stormcore::radar_interface::StormCell;

/// What presentation clients read from `GET /cells`.
#[derive(Debug, Clone, Serialize, Default)]
pub struct VisualizationModel {
    pub station_id: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
    pub cells: Vec<StormCell>,
    pub intercepts: Vec<PlannedIntercept>,
}

impl VisualizationModel {
    pub fn from_report(report: &CycleReport) -> Self {
        Self {
            station_id: Some(report.station_id.clone()),
            captured_at: Some(report.captured_at),
            cells: report.cells.clone(),
            intercepts: report.intercepts.clone(),
        }
    }

    /// A model from an older scan never replaces a newer one.
    pub fn supersedes(&self, current: &VisualizationModel) -> bool {
        match (self.captured_at, current.captured_at) {
            (Some(incoming), Some(existing)) => incoming >= existing,
            (_, None) => true,
            (None, Some(_)) => false,
        }
    }
}
