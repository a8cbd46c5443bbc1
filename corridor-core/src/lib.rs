//! Safe Corridor - journey risk scoring engine
//!
//! Takes one telemetry sample at a time for an in-progress journey and keeps
//! a cumulative, decaying risk score with a human-readable explanation.
//! Works from telemetry alone: no storage, no network.
//!
//! ```text
//! sample ─▶ JourneyStateMachine ─▶ RiskScorer ─▶ CorridorGeometry
//!              (ordering, counters,   (smoothing, rules,
//!               ETA, lifecycle)        decay, severity)
//!                   │
//!                   ▼
//!             JourneyUpdate / JourneyClosure  ─▶ caller persists & broadcasts
//! ```

pub mod config;
pub mod logic;

pub use config::{load_thresholds, save_thresholds, ConfigError};

pub use logic::corridor::cross_track_distance_m;

pub use logic::risk::{
    DerivedState,
    GeoPoint,
    RiskAssessment,
    RiskEvent,
    RiskScorer,
    ScoringThresholds,
    Severity,
    TelemetrySample,
};

pub use logic::journey::{
    JourneyCheckpoint,
    JourneyClosure,
    JourneyIdentity,
    JourneySnapshot,
    JourneyStateMachine,
    JourneyStatus,
    JourneyUpdate,
};
