use crate::math::geo::normalize_bearing;
use crate::math::GeoPoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Reflectivity at which hail probability starts to rise.
const HAIL_ONSET_DBZ: f64 = 40.0;
/// Percentage points of hail probability per dBZ above onset.
const HAIL_PERCENT_PER_DBZ: f64 = 2.5;

/// Motion and hazard attributes attached to a cell by an attribute estimator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HazardAttributes {
    /// Miles per hour.
    pub movement_speed: f64,
    /// Degrees clockwise from north.
    pub movement_bearing: f64,
    /// Echo top in feet.
    pub top_height: Option<u32>,
    pub has_rotation: bool,
    /// Azimuthal shear in s^-1.
    pub rotation_strength: Option<f64>,
    /// Inches.
    pub max_hail_size: Option<f64>,
    pub tvs: bool,
    pub meso: bool,
}

/// One detected storm cell, geo-located and immutable once classified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StormCell {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Peak intensity in the grid's native unit, rounded.
    pub intensity: i32,
    pub movement_speed: f64,
    pub movement_bearing: f64,
    pub top_height: Option<u32>,
    pub has_rotation: bool,
    pub rotation_strength: Option<f64>,
    pub hail_probability: u8,
    pub max_hail_size: Option<f64>,
    pub tvs: bool,
    pub meso: bool,
    pub pixel_count: usize,
    pub detected_at: DateTime<Utc>,
}

impl StormCell {
    pub fn new(
        id: String,
        position: GeoPoint,
        intensity: i32,
        pixel_count: usize,
        attributes: HazardAttributes,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            latitude: position.latitude,
            longitude: position.longitude,
            intensity,
            movement_speed: sanitize_speed(attributes.movement_speed),
            movement_bearing: sanitize_bearing(attributes.movement_bearing),
            top_height: attributes.top_height,
            has_rotation: attributes.has_rotation,
            rotation_strength: attributes.rotation_strength,
            hail_probability: hail_probability(intensity),
            max_hail_size: attributes.max_hail_size,
            tvs: attributes.tvs,
            meso: attributes.meso,
            pixel_count,
            detected_at,
        }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Copy of this cell under a tracked identity and motion vector.
    pub fn with_motion(&self, id: String, movement_speed: f64, movement_bearing: f64) -> Self {
        Self {
            id,
            movement_speed: sanitize_speed(movement_speed),
            movement_bearing: sanitize_bearing(movement_bearing),
            ..self.clone()
        }
    }

    /// Short human-readable summary used as a log event description.
    pub fn description(&self) -> String {
        format!("Cell {}: {} dBZ", self.id, self.intensity)
    }

    /// Fields handed to a logging collaborator for a `STORM_CELL` event.
    pub fn event_data(&self) -> serde_json::Value {
        json!({
            "id": self.id,
            "intensity": self.intensity,
            "latitude": self.latitude,
            "longitude": self.longitude,
            "movement_speed": self.movement_speed,
            "movement_bearing": self.movement_bearing,
            "hail_probability": self.hail_probability,
            "has_rotation": self.has_rotation,
            "tvs": self.tvs,
            "meso": self.meso,
        })
    }
}

/// `clamp(0, 100, round((dbz - 40) * 2.5))`.
pub fn hail_probability(intensity_dbz: i32) -> u8 {
    let raw = ((f64::from(intensity_dbz) - HAIL_ONSET_DBZ) * HAIL_PERCENT_PER_DBZ).round();
    raw.clamp(0.0, 100.0) as u8
}

/// Non-finite speeds collapse to a stationary cell.
fn sanitize_speed(speed: f64) -> f64 {
    if speed.is_finite() {
        speed.max(0.0)
    } else {
        0.0
    }
}

fn sanitize_bearing(bearing: f64) -> f64 {
    if bearing.is_finite() {
        normalize_bearing(bearing)
    } else {
        0.0
    }
}
