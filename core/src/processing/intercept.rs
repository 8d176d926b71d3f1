//! Discretized pursuit search between a mobile observer and a moving cell.
//!
//! Candidate times are `0, step, 2*step, ..., horizon` minutes after the
//! cell's detection time. The true optimum can fall between samples, so the
//! result is a coarse feasibility and ETA estimate whose resolution is the
//! configured step.

use crate::math::GeoMath;
use crate::prelude::InterceptConfig;
use crate::radar_interface::{InterceptResult, ObserverState, StormCell};
use chrono::Duration;

const MINUTES_PER_HOUR: f64 = 60.0;

#[derive(Debug, Clone)]
pub struct InterceptPlanner {
    config: InterceptConfig,
}

impl InterceptPlanner {
    pub fn new(config: InterceptConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InterceptConfig {
        &self.config
    }

    pub fn plan(&self, observer: &ObserverState, cell: &StormCell) -> Option<InterceptResult> {
        plan_intercept(
            observer,
            cell,
            self.config.horizon_minutes,
            self.config.step_minutes,
        )
    }
}

/// Earliest-reachable rendezvous within the horizon, or `None` when the
/// observer cannot get ahead of the cell at the given speeds.
///
/// Times are measured from `cell.detected_at`, when the cell's reported
/// position was valid.
pub fn plan_intercept(
    observer: &ObserverState,
    cell: &StormCell,
    horizon_minutes: f64,
    step_minutes: f64,
) -> Option<InterceptResult> {
    let window = InterceptConfig {
        horizon_minutes,
        step_minutes,
    };
    if let Err(err) = window.validate() {
        log::debug!("intercept search for {} skipped: {}", cell.id, err);
        return None;
    }

    let mut best: Option<InterceptResult> = None;
    let mut best_hours = f64::INFINITY;

    for step_index in 0..window.candidate_count() {
        let elapsed_minutes = (step_index as f64 * step_minutes).min(horizon_minutes);
        let elapsed_hours = elapsed_minutes / MINUTES_PER_HOUR;

        let (target_lat, target_lon) = GeoMath::project(
            cell.latitude,
            cell.longitude,
            cell.movement_bearing,
            cell.movement_speed * elapsed_hours,
        );
        let travel_distance =
            GeoMath::distance(observer.latitude, observer.longitude, target_lat, target_lon);
        let required_hours = travel_hours(travel_distance, observer.max_speed);

        if required_hours <= elapsed_hours && required_hours < best_hours {
            best_hours = required_hours;
            best = Some(InterceptResult {
                target_latitude: target_lat,
                target_longitude: target_lon,
                time_to_intercept: elapsed_minutes,
                travel_time: required_hours * MINUTES_PER_HOUR,
                travel_distance,
                bearing_to_target: GeoMath::bearing(
                    observer.latitude,
                    observer.longitude,
                    target_lat,
                    target_lon,
                ),
                estimated_arrival: cell.detected_at
                    + Duration::milliseconds((required_hours * 3_600_000.0).round() as i64),
            });
        }
    }

    if best.is_none() {
        log::debug!(
            "no intercept of {} within {} minutes at {} mph",
            cell.id,
            horizon_minutes,
            observer.max_speed
        );
    }
    best
}

fn travel_hours(distance: f64, max_speed: f64) -> f64 {
    if distance <= 0.0 {
        0.0
    } else if max_speed > 0.0 && max_speed.is_finite() {
        distance / max_speed
    } else {
        f64::INFINITY
    }
}
