//! Risk Module
//!
//! Cumulative, decaying risk scoring for one journey.
//!
//! ## Structure
//! - `types`: GeoPoint, TelemetrySample, DerivedState, Severity, RiskAssessment
//! - `rules`: Weights, limits and the configurable threshold set
//! - `scorer`: RiskScorer (smoothing, trust gate, rules, decay, severity)
//!
//! ## Usage
//! ```ignore
//! use corridor_core::logic::risk::{RiskScorer, DerivedState, GeoPoint, TelemetrySample};
//!
//! let mut scorer = RiskScorer::new(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0));
//! let sample = TelemetrySample::new(GeoPoint::new(0.0, 0.2), 40.0).with_accuracy(10.0);
//! let result = scorer.score(&DerivedState::default(), &sample);
//! assert_eq!(result.reasons, vec!["Unsafe speed (144 km/h)".to_string()]);
//! ```

pub mod types;
pub mod rules;
pub mod scorer;

pub use types::{
    DerivedState,
    GeoPoint,
    RiskAssessment,
    RiskEvent,
    Severity,
    TelemetrySample,
    INITIAL_DISTANCE_SENTINEL,
};

pub use rules::ScoringThresholds;

pub use scorer::{probability_for, probability_with, round_to, RiskScorer};
