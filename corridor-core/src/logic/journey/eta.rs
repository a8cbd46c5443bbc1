//! ETA / overdue check. Pure function of start, end and elapsed time.

use crate::logic::risk::{GeoPoint, ScoringThresholds};

/// Naive expected travel time (seconds) at the assumed travel speed
pub fn expected_travel_secs(start: &GeoPoint, end: &GeoPoint, thresholds: &ScoringThresholds) -> f64 {
    let meters = start.degree_distance(end) * thresholds.meters_per_degree;
    meters / thresholds.travel_speed_mps
}

/// Overdue once elapsed time passes both the scaled expectation and the floor
pub fn is_overdue(start: &GeoPoint, end: &GeoPoint, elapsed_secs: f64, thresholds: &ScoringThresholds) -> bool {
    let expected = expected_travel_secs(start, end, thresholds);
    elapsed_secs > expected * thresholds.overdue_factor && elapsed_secs > thresholds.overdue_floor_secs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_time_for_one_degree() {
        let t = ScoringThresholds::default();
        let secs = expected_travel_secs(&GeoPoint::new(0.0, 0.0), &GeoPoint::new(0.0, 1.0), &t);
        assert!((secs - 111_000.0 / 8.3).abs() < 1e-6);
    }

    #[test]
    fn test_short_trip_respects_floor() {
        let t = ScoringThresholds::default();
        let start = GeoPoint::new(0.0, 0.0);
        let end = GeoPoint::new(0.0, 0.001); // ~13 s expected
        assert!(!is_overdue(&start, &end, 120.0, &t));
        assert!(!is_overdue(&start, &end, 300.0, &t));
        assert!(is_overdue(&start, &end, 301.0, &t));
    }

    #[test]
    fn test_long_trip_needs_twice_expected() {
        let t = ScoringThresholds::default();
        let start = GeoPoint::new(0.0, 0.0);
        let end = GeoPoint::new(0.0, 0.1);
        let expected = expected_travel_secs(&start, &end, &t);
        assert!(!is_overdue(&start, &end, expected * 1.9, &t));
        assert!(is_overdue(&start, &end, expected * 2.1, &t));
    }

    #[test]
    fn test_zero_length_trip_is_overdue_after_floor() {
        let t = ScoringThresholds::default();
        let p = GeoPoint::new(10.0, 10.0);
        assert!(!is_overdue(&p, &p, 299.0, &t));
        assert!(is_overdue(&p, &p, 301.0, &t));
    }
}
