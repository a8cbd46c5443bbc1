//! Risk Scorer
//!
//! Stateful, per-journey accumulator. Each accepted sample is smoothed,
//! run through the rule set, and folded into a cumulative 0-100 score that
//! decays on quiet samples.
//!
//! Input: DerivedState (from the journey), TelemetrySample
//! Output: RiskAssessment

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use super::rules::ScoringThresholds;
use super::types::{DerivedState, GeoPoint, RiskAssessment, RiskEvent, Severity, TelemetrySample};
use crate::logic::corridor::cross_track_distance_m;

// ============================================================================
// SCORER
// ============================================================================

/// Cumulative risk state for one journey. Never shared between journeys.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    start: GeoPoint,
    end: GeoPoint,
    thresholds: ScoringThresholds,
    risk_score: f64,
    window: VecDeque<GeoPoint>,
    history: VecDeque<RiskEvent>,
}

impl RiskScorer {
    pub fn new(start: GeoPoint, end: GeoPoint) -> Self {
        Self::with_thresholds(start, end, ScoringThresholds::default())
    }

    pub fn with_thresholds(start: GeoPoint, end: GeoPoint, thresholds: ScoringThresholds) -> Self {
        Self {
            start,
            end,
            window: VecDeque::with_capacity(thresholds.smoothing_window),
            thresholds,
            risk_score: 0.0,
            history: VecDeque::new(),
        }
    }

    /// Score one accepted sample
    ///
    /// CORE LOGIC - deterministic and explainable
    pub fn score(&mut self, derived: &DerivedState, sample: &TelemetrySample) -> RiskAssessment {
        let t = &self.thresholds;
        let mut delta = 0.0;
        let mut reasons = Vec::new();

        // 1. Smoothing
        self.window.push_back(sample.location);
        while self.window.len() > t.smoothing_window {
            self.window.pop_front();
        }
        let position = self.effective_position(&sample.location);

        // 2. Trust gate
        let accuracy = sample.accuracy_m();
        let trusted = accuracy <= t.max_trusted_accuracy_m;

        if trusted {
            // A. Corridor
            let deviation = cross_track_distance_m(&self.start, &self.end, &position);
            if deviation > t.corridor_width_m {
                delta += t.weight_deviation;
                reasons.push(format!("Corridor violation (+{}m)", deviation.round() as i64));
            }

            // B. Speed
            if sample.speed > t.max_speed_mps {
                delta += t.weight_speed;
                reasons.push(format!("Unsafe speed ({} km/h)", (sample.speed * 3.6).round() as i64));
            }

            // C. Prolonged stop
            if sample.speed < t.stop_speed_mps && derived.consecutive_stops > t.stop_ticks_min {
                delta += t.weight_stop;
                reasons.push(format!("Prolonged stationary ({} ticks)", derived.consecutive_stops));
            }

            // D. Trend, on raw recorded distances: the median lags steady motion
            if derived.last_distance > derived.previous_distance
                && derived.moving_away_streak > t.moving_away_streak_min
            {
                delta += t.weight_direction;
                reasons.push("Moving away from destination".to_string());
            }
        } else {
            reasons.push(format!(
                "Low-confidence location ({:.0}m accuracy), monitoring paused",
                accuracy
            ));
        }

        // E. Overdue, trusted or not
        if derived.is_overdue {
            delta += t.weight_overdue;
            reasons.push("Ride overdue".to_string());
        }

        // 3. Cumulative update
        if delta > 0.0 {
            self.risk_score = (self.risk_score + delta).min(t.max_risk);
        } else {
            self.risk_score = (self.risk_score - t.decay_rate).max(0.0);
        }
        self.risk_score = self.risk_score.clamp(0.0, t.max_risk);

        // 4. Probability & severity
        let probability = probability_with(self.risk_score, t);
        let severity = Severity::from_score_with(self.risk_score, t);

        if delta > 0.0 {
            log::debug!(
                "Risk +{:.1} -> {:.1} ({}): {}",
                delta,
                self.risk_score,
                severity,
                reasons.join("; ")
            );
            self.record_event(sample, probability, &reasons);
        }

        RiskAssessment {
            score: round_to(self.risk_score, 1),
            probability: round_to(probability, 4),
            severity,
            reasons,
        }
    }

    /// Median of the window once it holds enough fixes, raw fix otherwise
    fn effective_position(&self, raw: &GeoPoint) -> GeoPoint {
        if self.window.len() < self.thresholds.smoothing_min_fixes {
            return *raw;
        }
        let mut lats: Vec<f64> = self.window.iter().map(|p| p.lat).collect();
        let mut lons: Vec<f64> = self.window.iter().map(|p| p.lon).collect();
        GeoPoint::new(median(&mut lats), median(&mut lons))
    }

    fn record_event(&mut self, sample: &TelemetrySample, probability: f64, reasons: &[String]) {
        let time = sample
            .timestamp
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_else(Utc::now);

        self.history.push_back(RiskEvent {
            time,
            score: self.risk_score,
            probability: round_to(probability, 4),
            reasons: reasons.to_vec(),
        });
        while self.history.len() > self.thresholds.history_limit {
            self.history.pop_front();
        }
    }

    /// Unrounded cumulative score
    pub fn risk_score(&self) -> f64 {
        self.risk_score
    }

    pub fn severity(&self) -> Severity {
        Severity::from_score_with(self.risk_score, &self.thresholds)
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn window(&self) -> impl Iterator<Item = &GeoPoint> {
        self.window.iter()
    }

    /// Audit log of score increases, oldest first
    pub fn history(&self) -> &VecDeque<RiskEvent> {
        &self.history
    }

    pub fn thresholds(&self) -> &ScoringThresholds {
        &self.thresholds
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Logistic mapping of a score with the default curve
pub fn probability_for(score: f64) -> f64 {
    probability_with(score, &ScoringThresholds::default())
}

pub fn probability_with(score: f64, thresholds: &ScoringThresholds) -> f64 {
    1.0 / (1.0 + (-thresholds.sigmoid_steepness * (score - thresholds.sigmoid_midpoint)).exp())
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Median, averaging the middle pair for even lengths
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::corridor::EARTH_RADIUS_M;

    const START: GeoPoint = GeoPoint::new(0.0, 0.0);
    const END: GeoPoint = GeoPoint::new(0.0, 1.0);

    fn five_km_north() -> GeoPoint {
        GeoPoint::new((5000.0 / EARTH_RADIUS_M).to_degrees(), 0.5)
    }

    fn walking(lon: f64) -> TelemetrySample {
        TelemetrySample::new(GeoPoint::new(0.0, lon), 5.0).with_accuracy(5.0)
    }

    #[test]
    fn test_quiet_sample_has_no_reasons() {
        let mut scorer = RiskScorer::new(START, END);
        let result = scorer.score(&DerivedState::default(), &walking(0.1));
        assert_eq!(result.score, 0.0);
        assert_eq!(result.severity, Severity::Normal);
        assert!(result.reasons.is_empty());
        assert!(scorer.history().is_empty());
    }

    #[test]
    fn test_unsafe_speed_only() {
        let mut scorer = RiskScorer::new(START, END);
        let sample = TelemetrySample::new(GeoPoint::new(0.0, 0.2), 40.0).with_accuracy(10.0);

        let result = scorer.score(&DerivedState::default(), &sample);

        assert_eq!(result.score, 10.0);
        assert_eq!(result.reasons, vec!["Unsafe speed (144 km/h)".to_string()]);
        assert_eq!(scorer.history().len(), 1);
    }

    #[test]
    fn test_corridor_violation_on_first_fix() {
        let mut scorer = RiskScorer::new(START, END);
        let sample = TelemetrySample::new(five_km_north(), 5.0).with_accuracy(5.0);

        let result = scorer.score(&DerivedState::default(), &sample);

        assert_eq!(result.score, 15.0);
        assert_eq!(result.reasons.len(), 1);
        assert!(result.reasons[0].starts_with("Corridor violation (+500"));
    }

    #[test]
    fn test_low_accuracy_pauses_geometry() {
        let mut scorer = RiskScorer::new(START, END);
        let sample = TelemetrySample::new(five_km_north(), 45.0).with_accuracy(100.0);
        let derived = DerivedState {
            consecutive_stops: 30,
            ..Default::default()
        };

        let result = scorer.score(&derived, &sample);

        assert_eq!(result.score, 0.0);
        assert_eq!(result.reasons.len(), 1);
        assert!(result.reasons[0].to_lowercase().contains("low-confidence"));
        assert!(scorer.history().is_empty());
    }

    #[test]
    fn test_missing_accuracy_is_trusted() {
        let mut scorer = RiskScorer::new(START, END);
        let sample = TelemetrySample::new(five_km_north(), 5.0);
        let result = scorer.score(&DerivedState::default(), &sample);
        assert_eq!(result.score, 15.0);
    }

    #[test]
    fn test_overdue_fires_even_when_untrusted() {
        let mut scorer = RiskScorer::new(START, END);
        let sample = walking(0.1).with_accuracy(300.0);
        let derived = DerivedState {
            is_overdue: true,
            ..Default::default()
        };

        let result = scorer.score(&derived, &sample);

        assert_eq!(result.score, 20.0);
        assert_eq!(result.reasons.len(), 2);
        assert!(result.reasons[0].contains("monitoring paused"));
        assert_eq!(result.reasons[1], "Ride overdue");
    }

    #[test]
    fn test_prolonged_stop_needs_counter_above_limit() {
        let mut scorer = RiskScorer::new(START, END);
        let stopped = TelemetrySample::new(GeoPoint::new(0.0, 0.1), 0.5);

        let at_limit = DerivedState {
            consecutive_stops: 24,
            ..Default::default()
        };
        assert!(scorer.score(&at_limit, &stopped).reasons.is_empty());

        let over = DerivedState {
            consecutive_stops: 25,
            ..Default::default()
        };
        let result = scorer.score(&over, &stopped);
        assert_eq!(result.reasons, vec!["Prolonged stationary (25 ticks)".to_string()]);
        assert_eq!(result.score, 15.0);
    }

    #[test]
    fn test_moving_away_needs_streak_and_increase() {
        let mut scorer = RiskScorer::new(START, END);
        // Heading west, away from (0, 1)
        let sample = TelemetrySample::new(GeoPoint::new(0.0, -0.2), 5.0);

        let short_streak = DerivedState {
            previous_distance: 1.1,
            last_distance: 1.2,
            moving_away_streak: 5,
            ..Default::default()
        };
        assert!(scorer.score(&short_streak, &sample).reasons.is_empty());

        let closer = DerivedState {
            previous_distance: 1.2,
            last_distance: 1.2,
            moving_away_streak: 9,
            ..Default::default()
        };
        assert!(scorer.score(&closer, &sample).reasons.is_empty());

        let mut scorer = RiskScorer::new(START, END);
        let long_streak = DerivedState {
            previous_distance: 1.1,
            last_distance: 1.2,
            moving_away_streak: 6,
            ..Default::default()
        };
        let result = scorer.score(&long_streak, &sample);
        assert_eq!(result.reasons, vec!["Moving away from destination".to_string()]);
        assert_eq!(result.score, 5.0);
    }

    #[test]
    fn test_decay_by_two_until_zero() {
        let mut scorer = RiskScorer::new(START, END);
        let fast = TelemetrySample::new(GeoPoint::new(0.0, 0.1), 40.0);
        scorer.score(&DerivedState::default(), &fast);
        assert_eq!(scorer.risk_score(), 10.0);

        let mut previous = scorer.risk_score();
        for _ in 0..5 {
            let result = scorer.score(&DerivedState::default(), &walking(0.1));
            assert_eq!(result.score, previous - 2.0);
            previous = result.score;
        }
        assert_eq!(previous, 0.0);

        let result = scorer.score(&DerivedState::default(), &walking(0.1));
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_score_capped_at_max() {
        let mut scorer = RiskScorer::new(START, END);
        let sample = TelemetrySample::new(five_km_north(), 40.0);
        let derived = DerivedState {
            is_overdue: true,
            ..Default::default()
        };
        for _ in 0..10 {
            let result = scorer.score(&derived, &sample);
            assert!(result.score <= 100.0 && result.score >= 0.0);
        }
        assert_eq!(scorer.risk_score(), 100.0);
        assert_eq!(scorer.severity(), Severity::Critical);
    }

    #[test]
    fn test_window_never_exceeds_limit() {
        let mut scorer = RiskScorer::new(START, END);
        for i in 0..12 {
            scorer.score(&DerivedState::default(), &walking(i as f64 * 0.01));
            assert!(scorer.window_len() <= 5);
        }
        assert_eq!(scorer.window_len(), 5);
        let first = scorer.window().next().copied();
        assert_eq!(first, Some(GeoPoint::new(0.0, 7.0 * 0.01)));
    }

    #[test]
    fn test_median_suppresses_single_outlier() {
        let mut scorer = RiskScorer::new(START, END);
        for i in 0..4 {
            scorer.score(&DerivedState::default(), &walking(0.1 + i as f64 * 0.001));
        }
        let jump = TelemetrySample::new(five_km_north(), 5.0).with_accuracy(5.0);
        let result = scorer.score(&DerivedState::default(), &jump);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_probability_curve() {
        assert_eq!(probability_for(50.0), 0.5);
        let mut last = probability_for(0.0);
        for s in 1..=100 {
            let p = probability_for(s as f64);
            assert!(p > last);
            last = p;
        }
        assert!(probability_for(0.0) > 0.0);
        assert!(probability_for(100.0) < 1.0);
    }

    #[test]
    fn test_history_is_capped() {
        let thresholds = ScoringThresholds {
            history_limit: 3,
            ..Default::default()
        };
        let mut scorer = RiskScorer::with_thresholds(START, END, thresholds);
        let fast = TelemetrySample::new(GeoPoint::new(0.0, 0.1), 40.0);
        for i in 0..6 {
            scorer.score(&DerivedState::default(), &fast.clone().with_timestamp(1_000 + i));
        }
        assert_eq!(scorer.history().len(), 3);
        let first = &scorer.history()[0];
        assert_eq!(first.time.timestamp_millis(), 1_003);
        assert_eq!(first.score, 40.0);
    }
}
