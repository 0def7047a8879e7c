// src/geo.rs

use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Great-circle distance in meters between two points (Haversine formula).
pub fn distance_meters(a: Coordinates, b: Coordinates) -> f64 {
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();
    EARTH_RADIUS_METERS * c
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_EPSILON: f64 = 1e-6;

    #[test]
    fn identical_points_have_zero_distance() {
        let p = Coordinates::new(14.2753, 121.1298);
        assert!(distance_meters(p, p).abs() < TEST_EPSILON);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Coordinates::new(14.2753, 121.1298);
        let b = Coordinates::new(14.2810, 121.1265);
        let ab = distance_meters(a, b);
        let ba = distance_meters(b, a);
        assert!((ab - ba).abs() < TEST_EPSILON);
        assert!(ab > 0.0);
    }

    #[test]
    fn known_separation_is_close_to_expected() {
        // One degree of latitude is ~111.19 km on a 6371 km sphere.
        let a = Coordinates::new(14.0, 121.0);
        let b = Coordinates::new(15.0, 121.0);
        let d = distance_meters(a, b);
        assert!((d - 111_195.0).abs() < 100.0, "got {}", d);
    }

    #[test]
    fn short_offset_lands_near_150_meters() {
        // ~150 m north of the reference point used by the default workplace list.
        let center = Coordinates::new(14.2753, 121.1298);
        let moved = Coordinates::new(14.2753 + 150.0 / 111_195.0, 121.1298);
        let d = distance_meters(center, moved);
        assert!((d - 150.0).abs() < 1.0, "got {}", d);
    }
}
