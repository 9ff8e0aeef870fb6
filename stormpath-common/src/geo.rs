//! Geographic primitives
//!
//! Great-circle math used by the segmenter and for span lengths. Points are
//! `[lat, lon]` pairs on the wire, matching the road-data build output.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A single polyline vertex. Serializes as a two-element `[lat, lon]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point(pub f64, pub f64);

impl Point {
    pub fn lat(&self) -> f64 {
        self.0
    }

    pub fn lon(&self) -> f64 {
        self.1
    }

    /// False for NaN or infinite coordinates
    pub fn is_finite(&self) -> bool {
        self.0.is_finite() && self.1.is_finite()
    }
}

/// Haversine great-circle distance between two points, in kilometers
pub fn haversine_km(a: Point, b: Point) -> f64 {
    let d_lat = (b.lat() - a.lat()).to_radians();
    let d_lon = (b.lon() - a.lon()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat().to_radians().cos() * b.lat().to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Initial bearing from one point to another, in degrees normalized to [0, 360)
///
/// A zero-length vector yields 0.0 (atan2(0, 0) is defined as 0); callers
/// treat that as no direction change.
pub fn bearing_deg(from: Point, to: Point) -> f64 {
    let lat1 = from.lat().to_radians();
    let lat2 = to.lat().to_radians();
    let d_lon = (to.lon() - from.lon()).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    let bearing = y.atan2(x).to_degrees();
    (bearing + 360.0) % 360.0
}

/// Total great-circle length of a polyline, in kilometers
pub fn polyline_length_km(points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_km(pair[0], pair[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_one_degree_latitude() {
        // One degree of latitude is ~111.19 km on a 6371 km sphere
        let d = haversine_km(Point(45.0, -71.0), Point(46.0, -71.0));
        assert!((d - 111.19).abs() < 0.1, "got {d}");
    }

    #[test]
    fn haversine_zero_for_identical_points() {
        assert_eq!(haversine_km(Point(45.0, -71.0), Point(45.0, -71.0)), 0.0);
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = Point(45.0, -71.0);
        assert!((bearing_deg(origin, Point(46.0, -71.0)) - 0.0).abs() < 0.01);
        assert!((bearing_deg(origin, Point(44.0, -71.0)) - 180.0).abs() < 0.01);
        let east = bearing_deg(origin, Point(45.0, -70.0));
        assert!((east - 90.0).abs() < 1.0, "got {east}");
    }

    #[test]
    fn bearing_of_zero_length_vector_is_zero() {
        let p = Point(45.0, -71.0);
        assert_eq!(bearing_deg(p, p), 0.0);
    }

    #[test]
    fn polyline_length_sums_legs() {
        let line = [Point(45.0, -71.0), Point(45.5, -71.0), Point(46.0, -71.0)];
        let total = polyline_length_km(&line);
        let direct = haversine_km(line[0], line[2]);
        assert!((total - direct).abs() < 0.01);
    }

    #[test]
    fn point_serializes_as_pair() {
        let json = serde_json::to_string(&Point(45.5, -71.25)).unwrap();
        assert_eq!(json, "[45.5,-71.25]");
        let back: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Point(45.5, -71.25));
    }
}
