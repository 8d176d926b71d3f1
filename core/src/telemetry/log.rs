use crate::radar_interface::{InterceptResult, StormCell};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One structured event handed to the logging collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub description: String,
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Copy)]
pub struct LogManager;

impl LogManager {
    pub fn new() -> Self {
        Self
    }

    pub fn record(&self, message: &str) {
        debug!("{}", message);
    }

    /// Emits `{timestamp, event_type, description, data}` as one JSON line.
    pub fn log_event(&self, event_type: &str, description: &str, data: Option<Value>) -> EventRecord {
        let record = EventRecord {
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            description: description.to_string(),
            data,
        };
        match serde_json::to_string(&record) {
            Ok(line) => info!("{}", line),
            Err(err) => warn!("dropping {} event: {}", event_type, err),
        }
        record
    }

    pub fn log_storm_cell(&self, cell: &StormCell) -> EventRecord {
        self.log_event("STORM_CELL", &cell.description(), Some(cell.event_data()))
    }

    pub fn log_intercept(&self, cell: &StormCell, intercept: &InterceptResult) -> EventRecord {
        let description = format!(
            "Intercept {} in {:.0} min, {:.1} mi at {:.0} deg ({:.0} min drive)",
            cell.id,
            intercept.time_to_intercept,
            intercept.travel_distance,
            intercept.bearing_to_target,
            intercept.travel_time
        );
        self.log_event(
            "INTERCEPT",
            &description,
            Some(json!({
                "id": cell.id,
                "target_latitude": intercept.target_latitude,
                "target_longitude": intercept.target_longitude,
                "time_to_intercept": intercept.time_to_intercept,
                "travel_time": intercept.travel_time,
                "travel_distance": intercept.travel_distance,
                "bearing_to_target": intercept.bearing_to_target,
                "estimated_arrival": intercept.estimated_arrival,
            })),
        )
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}
