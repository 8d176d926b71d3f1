//! Optional cross-cycle identity layer on top of per-scan detection.
//!
//! Every pass numbers its cells from `CELL-1` again, so the same physical
//! storm changes id each scan. The tracker matches each new cell to the
//! nearest predicted position of a live track (greedy, closest pair first),
//! gated by how far that track could plausibly have moved, and re-issues the
//! cell under the track's stable `STORM-{n}` id with a smoothed motion vector.

use crate::math::geo::normalize_bearing;
use crate::math::{GeoMath, GeoPoint, StatsHelper};
use crate::prelude::{DetectionError, DetectionResult};
use crate::radar_interface::StormCell;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Slack added to the kinematic gate, miles.
    pub margin_miles: f64,
    /// Scans a track may go unmatched before it is dropped.
    pub max_missed_scans: u32,
    /// Weight of the newest observed motion, 0..=1.
    pub smoothing: f64,
    /// Interval assumed when consecutive scans share a timestamp.
    pub default_interval_minutes: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            margin_miles: 5.0,
            max_missed_scans: 2,
            smoothing: 0.5,
            default_interval_minutes: 5.0,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> DetectionResult<()> {
        if !(self.smoothing.is_finite() && (0.0..=1.0).contains(&self.smoothing)) {
            return Err(DetectionError::InvalidConfig(format!(
                "smoothing must be within 0..=1, got {}",
                self.smoothing
            )));
        }
        if !(self.margin_miles.is_finite() && self.margin_miles >= 0.0) {
            return Err(DetectionError::InvalidConfig(format!(
                "margin_miles must be non-negative, got {}",
                self.margin_miles
            )));
        }
        if !(self.default_interval_minutes.is_finite() && self.default_interval_minutes > 0.0) {
            return Err(DetectionError::InvalidConfig(format!(
                "default_interval_minutes must be positive, got {}",
                self.default_interval_minutes
            )));
        }
        Ok(())
    }
}

/// A storm followed across scans.
#[derive(Debug, Clone)]
pub struct TrackedCell {
    pub id: String,
    pub latest: StormCell,
    /// Motion as (east, north) components in mph.
    pub velocity: (f64, f64),
    /// Scans in which this storm was matched.
    pub age: u32,
    pub scans_since_seen: u32,
    last_seen: DateTime<Utc>,
}

impl TrackedCell {
    fn new(id: String, cell: StormCell) -> Self {
        let velocity = components(cell.movement_speed, cell.movement_bearing);
        Self {
            id,
            last_seen: cell.detected_at,
            latest: cell,
            velocity,
            age: 1,
            scans_since_seen: 0,
        }
    }

    pub fn speed(&self) -> f64 {
        self.velocity.0.hypot(self.velocity.1)
    }

    pub fn bearing(&self) -> f64 {
        if self.speed() == 0.0 {
            return 0.0;
        }
        normalize_bearing(self.velocity.0.atan2(self.velocity.1).to_degrees())
    }

    fn predict(&self, hours: f64) -> GeoPoint {
        GeoMath::project_point(self.latest.position(), self.bearing(), self.speed() * hours)
    }

    fn absorb(&mut self, cell: StormCell, hours: f64, smoothing: f64) {
        let moved = GeoMath::distance_between(self.latest.position(), cell.position());
        let heading = GeoMath::bearing_between(self.latest.position(), cell.position());
        let observed = components(moved / hours, heading);

        self.velocity = if self.age == 1 {
            observed
        } else {
            (
                StatsHelper::smooth(self.velocity.0, observed.0, smoothing),
                StatsHelper::smooth(self.velocity.1, observed.1, smoothing),
            )
        };
        self.last_seen = cell.detected_at;
        self.latest = cell;
        self.age += 1;
        self.scans_since_seen = 0;
    }
}

fn components(speed: f64, bearing: f64) -> (f64, f64) {
    let theta = bearing.to_radians();
    (speed * theta.sin(), speed * theta.cos())
}

/// Assigns stable identities to cells from consecutive detection passes.
pub struct CellTracker {
    config: TrackerConfig,
    tracks: Vec<TrackedCell>,
    next_id: u64,
    last_scan: Option<DateTime<Utc>>,
}

impl CellTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: Vec::new(),
            next_id: 1,
            last_scan: None,
        }
    }

    pub fn tracks(&self) -> &[TrackedCell] {
        &self.tracks
    }

    /// Capture time of the newest pass absorbed so far.
    pub fn last_scan(&self) -> Option<DateTime<Utc>> {
        self.last_scan
    }

    /// True when a pass captured at `captured_at` predates one already absorbed.
    pub fn is_stale(&self, captured_at: DateTime<Utc>) -> bool {
        self.last_scan.map_or(false, |last| captured_at < last)
    }

    /// Matches one pass's cells against live tracks and returns them, in
    /// input order, under their tracked ids and motion.
    pub fn update(&mut self, cells: &[StormCell]) -> Vec<StormCell> {
        let Some(scan_time) = cells.iter().map(|cell| cell.detected_at).max() else {
            self.age_unmatched(&[]);
            return Vec::new();
        };
        self.last_scan = Some(self.last_scan.map_or(scan_time, |last| last.max(scan_time)));

        let intervals: Vec<f64> = self
            .tracks
            .iter()
            .map(|track| self.interval_hours(track.last_seen, scan_time))
            .collect();

        let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
        for (i, track) in self.tracks.iter().enumerate() {
            let predicted = track.predict(intervals[i]);
            let gate = track.speed() * intervals[i] + self.config.margin_miles;
            for (j, cell) in cells.iter().enumerate() {
                let distance = GeoMath::distance_between(predicted, cell.position());
                if distance <= gate {
                    candidates.push((distance, i, j));
                }
            }
        }
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut track_taken = vec![false; self.tracks.len()];
        let mut output: Vec<Option<StormCell>> = vec![None; cells.len()];
        for (_, i, j) in candidates {
            if track_taken[i] || output[j].is_some() {
                continue;
            }
            track_taken[i] = true;
            let track = &mut self.tracks[i];
            track.absorb(cells[j].clone(), intervals[i], self.config.smoothing);
            output[j] = Some(cells[j].with_motion(track.id.clone(), track.speed(), track.bearing()));
        }

        self.age_unmatched(&track_taken);

        for (j, slot) in output.iter_mut().enumerate() {
            if slot.is_none() {
                let id = format!("STORM-{}", self.next_id);
                self.next_id += 1;
                let cell = &cells[j];
                *slot = Some(cell.with_motion(id.clone(), cell.movement_speed, cell.movement_bearing));
                self.tracks.push(TrackedCell::new(id, cell.clone()));
            }
        }

        log::debug!(
            "tracker holds {} tracks after {} cells",
            self.tracks.len(),
            cells.len()
        );
        output.into_iter().flatten().collect()
    }

    fn age_unmatched(&mut self, matched: &[bool]) {
        let max_missed = self.config.max_missed_scans;
        let mut index = 0;
        self.tracks.retain_mut(|track| {
            let was_matched = matched.get(index).copied().unwrap_or(false);
            index += 1;
            if !was_matched {
                track.scans_since_seen += 1;
            }
            track.scans_since_seen <= max_missed
        });
    }

    fn interval_hours(&self, since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let minutes = (now - since).num_milliseconds() as f64 / 60_000.0;
        if minutes > 0.0 {
            minutes / 60.0
        } else {
            self.config.default_interval_minutes.max(f64::EPSILON) / 60.0
        }
    }
}
