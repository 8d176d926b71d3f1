use serde::{Deserialize, Serialize};

/// Mean Earth radius in statute miles.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Meters per statute mile.
pub const METERS_PER_MILE: f64 = 1609.344;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Great-circle helpers on a spherical Earth.
pub struct GeoMath;

impl GeoMath {
    /// Haversine distance in miles.
    pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
        let lat1_rad = lat1.to_radians();
        let lat2_rad = lat2.to_radians();
        let dlat = (lat2 - lat1).to_radians();
        let dlon = (lon2 - lon1).to_radians();

        let a = (dlat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
        EARTH_RADIUS_MILES * c
    }

    /// Initial bearing from point 1 to point 2, in `[0, 360)`.
    ///
    /// Coincident points yield 0.
    pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
        let lat1_rad = lat1.to_radians();
        let lat2_rad = lat2.to_radians();
        let dlon = (lon2 - lon1).to_radians();

        let y = dlon.sin() * lat2_rad.cos();
        let x = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * dlon.cos();
        if y == 0.0 && x == 0.0 {
            return 0.0;
        }
        normalize_bearing(y.atan2(x).to_degrees())
    }

    /// Destination reached by travelling `distance` miles along the great
    /// circle leaving `(lat, lon)` at `bearing` degrees.
    pub fn project(lat: f64, lon: f64, bearing: f64, distance: f64) -> (f64, f64) {
        if distance == 0.0 {
            return (lat, lon);
        }
        let angular = distance / EARTH_RADIUS_MILES;
        let theta = bearing.to_radians();
        let lat1 = lat.to_radians();
        let lon1 = lon.to_radians();

        let sin_lat2 = lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * theta.cos();
        let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();
        let lon2 = lon1
            + (theta.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * sin_lat2);

        let lon_deg = (lon2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
        (lat2.to_degrees(), lon_deg)
    }

    pub fn distance_between(from: GeoPoint, to: GeoPoint) -> f64 {
        Self::distance(from.latitude, from.longitude, to.latitude, to.longitude)
    }

    pub fn bearing_between(from: GeoPoint, to: GeoPoint) -> f64 {
        Self::bearing(from.latitude, from.longitude, to.latitude, to.longitude)
    }

    pub fn project_point(from: GeoPoint, bearing: f64, distance: f64) -> GeoPoint {
        let (latitude, longitude) = Self::project(from.latitude, from.longitude, bearing, distance);
        GeoPoint {
            latitude,
            longitude,
        }
    }
}

/// Wraps any finite angle into `[0, 360)`.
pub fn normalize_bearing(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Smallest absolute difference between two bearings, in degrees.
pub fn bearing_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    diff.min(360.0 - diff)
}
