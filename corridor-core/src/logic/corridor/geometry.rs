//! Corridor Geometry
//!
//! Spherical-earth helpers for measuring how far a fix strays from the
//! straight great-circle path between a journey's start and end.
//! Pure functions, no state.

use std::f64::consts::PI;

use crate::logic::risk::GeoPoint;

/// Mean earth radius (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Paths shorter than this (radians, ~6 cm) have no usable bearing
const DEGENERATE_ANGLE_RAD: f64 = 1e-8;

/// Initial great-circle bearing from `from` to `to` (radians)
pub fn initial_bearing(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let (lat1, lon1) = (from.lat.to_radians(), from.lon.to_radians());
    let (lat2, lon2) = (to.lat.to_radians(), to.lon.to_radians());

    let y = (lon2 - lon1).sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * (lon2 - lon1).cos();
    y.atan2(x)
}

/// Central angle between two points (spherical law of cosines, radians)
pub fn angular_distance(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let (lat1, lon1) = (from.lat.to_radians(), from.lon.to_radians());
    let (lat2, lon2) = (to.lat.to_radians(), to.lon.to_radians());

    let cos_angle = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * (lon2 - lon1).cos();
    // Rounding can push the cosine just past ±1 for near-identical points
    cos_angle.clamp(-1.0, 1.0).acos()
}

/// Great-circle distance (meters)
pub fn great_circle_distance_m(from: &GeoPoint, to: &GeoPoint) -> f64 {
    angular_distance(from, to) * EARTH_RADIUS_M
}

/// Perpendicular distance (meters) from `point` to the great circle through
/// `start` and `end`. Always >= 0.
///
/// A zero-length or antipodal path has no defined direction; it is treated
/// as an always-safe corridor and yields 0.
pub fn cross_track_distance_m(start: &GeoPoint, end: &GeoPoint, point: &GeoPoint) -> f64 {
    let path_angle = angular_distance(start, end);
    if path_angle < DEGENERATE_ANGLE_RAD || (PI - path_angle) < DEGENERATE_ANGLE_RAD {
        return 0.0;
    }

    let to_point = angular_distance(start, point);
    if to_point < DEGENERATE_ANGLE_RAD {
        return 0.0;
    }

    let bearing_to_end = initial_bearing(start, end);
    let bearing_to_point = initial_bearing(start, point);

    let sin_xt = (to_point.sin() * (bearing_to_point - bearing_to_end).sin()).clamp(-1.0, 1.0);
    let distance = (sin_xt.asin() * EARTH_RADIUS_M).abs();

    if distance.is_finite() {
        distance
    } else {
        0.0
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const START: GeoPoint = GeoPoint::new(0.0, 0.0);
    const END: GeoPoint = GeoPoint::new(0.0, 1.0);

    #[test]
    fn test_point_on_own_degenerate_path_is_zero() {
        for p in [
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(51.5074, -0.1278),
            GeoPoint::new(-33.8688, 151.2093),
            GeoPoint::new(89.9, 179.9),
        ] {
            assert_eq!(cross_track_distance_m(&p, &p, &p), 0.0);
        }
    }

    #[test]
    fn test_point_on_path_is_zero() {
        let on_line = GeoPoint::new(0.0, 0.5);
        assert!(cross_track_distance_m(&START, &END, &on_line) < 1e-6);
    }

    #[test]
    fn test_five_km_north_of_equator_path() {
        // 5 km north ≈ 0.04497°
        let north = GeoPoint::new(5000.0 / EARTH_RADIUS_M * 180.0 / PI, 0.5);
        let xt = cross_track_distance_m(&START, &END, &north);
        assert!((xt - 5000.0).abs() < 1.0, "got {}", xt);
    }

    #[test]
    fn test_symmetric_sides() {
        let north = GeoPoint::new(0.02, 0.3);
        let south = GeoPoint::new(-0.02, 0.3);
        let a = cross_track_distance_m(&START, &END, &north);
        let b = cross_track_distance_m(&START, &END, &south);
        assert!(a > 0.0);
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn test_identical_start_end_is_always_safe() {
        let far = GeoPoint::new(1.0, 1.0);
        assert_eq!(cross_track_distance_m(&START, &START, &far), 0.0);
    }

    #[test]
    fn test_antipodal_path_is_always_safe() {
        let antipode = GeoPoint::new(0.0, 180.0);
        let p = GeoPoint::new(10.0, 45.0);
        let xt = cross_track_distance_m(&START, &antipode, &p);
        assert_eq!(xt, 0.0);
    }

    #[test]
    fn test_bearing_due_east_and_north() {
        assert!((initial_bearing(&START, &END) - PI / 2.0).abs() < 1e-12);
        let north = GeoPoint::new(1.0, 0.0);
        assert!(initial_bearing(&START, &north).abs() < 1e-12);
    }

    #[test]
    fn test_one_degree_of_longitude_at_equator() {
        let d = great_circle_distance_m(&START, &END);
        assert!((d - 111_194.9).abs() < 1.0, "got {}", d);
    }
}
