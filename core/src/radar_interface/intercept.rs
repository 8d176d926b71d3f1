use crate::math::GeoPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position and speed limit of a mobile observer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObserverState {
    pub latitude: f64,
    pub longitude: f64,
    /// Miles per hour.
    pub max_speed: f64,
}

impl ObserverState {
    pub fn new(latitude: f64, longitude: f64, max_speed: f64) -> Self {
        Self {
            latitude,
            longitude,
            max_speed,
        }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Earliest feasible rendezvous found by the intercept planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterceptResult {
    pub target_latitude: f64,
    pub target_longitude: f64,
    /// Minutes after detection at which the storm reaches the target: the
    /// winning candidate time `t` of the search.
    pub time_to_intercept: f64,
    /// Observer driving time to the target, in minutes; never above
    /// `time_to_intercept`.
    pub travel_time: f64,
    /// Miles from the observer to the target.
    pub travel_distance: f64,
    /// Degrees clockwise from north, observer to target.
    pub bearing_to_target: f64,
    pub estimated_arrival: DateTime<Utc>,
}

impl InterceptResult {
    pub fn target(&self) -> GeoPoint {
        GeoPoint::new(self.target_latitude, self.target_longitude)
    }

    /// Minutes the observer waits at the target before the storm arrives.
    pub fn slack(&self) -> f64 {
        (self.time_to_intercept - self.travel_time).max(0.0)
    }
}
