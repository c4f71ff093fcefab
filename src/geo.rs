//! Great-circle distance between WGS84 coordinates.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Haversine distance to `other`, in meters.
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        haversine_meters(self.lat, self.lon, other.lat, other.lon)
    }

    /// Distance rounded to whole meters, or `None` if it is not finite.
    pub fn rounded_distance_to(&self, other: &Coordinates) -> Option<u64> {
        let d = self.distance_to(other);
        d.is_finite().then(|| d.round() as u64)
    }
}

pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}
