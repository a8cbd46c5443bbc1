//! Risk Types
//!
//! Data structures shared by the scorer and the journey state machine.
//! No scoring logic lives here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rules::ScoringThresholds;

// ============================================================================
// LOCATION & TELEMETRY
// ============================================================================

/// WGS-84 position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Straight-line distance in degree space (not geodesic)
    pub fn degree_distance(&self, other: &GeoPoint) -> f64 {
        ((self.lat - other.lat).powi(2) + (self.lon - other.lon).powi(2)).sqrt()
    }
}

/// One location/speed fix reported by the rider device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub location: GeoPoint,
    /// Ground speed (m/s)
    pub speed: f64,
    /// Horizontal accuracy (m). Absent means trusted.
    #[serde(default)]
    pub accuracy: Option<f64>,
    /// Sender clock, epoch milliseconds
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl TelemetrySample {
    pub fn new(location: GeoPoint, speed: f64) -> Self {
        Self {
            location,
            speed,
            accuracy: None,
            timestamp: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp = Some(timestamp_ms);
        self
    }

    /// Reported accuracy, 0.0 when unknown
    pub fn accuracy_m(&self) -> f64 {
        self.accuracy.unwrap_or(0.0)
    }
}

// ============================================================================
// DERIVED STATE (maintained by the journey, read by the scorer)
// ============================================================================

/// Distance stored before the first fix, large enough that the first
/// fix never counts as moving away.
pub const INITIAL_DISTANCE_SENTINEL: f64 = 999_999.0;

/// Per-journey counters updated once per accepted sample, before scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedState {
    /// Consecutive samples below the stop speed
    pub consecutive_stops: u32,
    /// Distance-to-destination (degrees) recorded before this sample
    pub previous_distance: f64,
    /// Distance-to-destination (degrees) of the latest raw fix
    pub last_distance: f64,
    /// Consecutive samples that ended farther from the destination
    pub moving_away_streak: u32,
    pub is_overdue: bool,
}

impl Default for DerivedState {
    fn default() -> Self {
        Self {
            consecutive_stops: 0,
            previous_distance: INITIAL_DISTANCE_SENTINEL,
            last_distance: INITIAL_DISTANCE_SENTINEL,
            moving_away_streak: 0,
            is_overdue: false,
        }
    }
}

// ============================================================================
// SEVERITY
// ============================================================================

/// Discrete risk tier, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Nothing unusual
    Normal,
    /// Something worth watching
    Elevated,
    /// Operator should keep the journey on screen
    Monitoring,
    /// Needs action now
    Critical,
}

impl Severity {
    /// Classify with the default cut-offs
    pub fn from_score(score: f64) -> Self {
        Self::from_score_with(score, &ScoringThresholds::default())
    }

    /// Descending comparison, first match wins
    pub fn from_score_with(score: f64, thresholds: &ScoringThresholds) -> Self {
        if score >= thresholds.critical_min {
            Severity::Critical
        } else if score >= thresholds.monitoring_min {
            Severity::Monitoring
        } else if score >= thresholds.elevated_min {
            Severity::Elevated
        } else {
            Severity::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Normal => "NORMAL",
            Severity::Elevated => "ELEVATED",
            Severity::Monitoring => "MONITORING",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ASSESSMENT & AUDIT
// ============================================================================

/// Output of scoring one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Cumulative score, 0-100, rounded to 1 decimal
    pub score: f64,
    /// Logistic companion of the score, rounded to 4 decimals
    pub probability: f64,
    pub severity: Severity,
    pub reasons: Vec<String>,
}

/// Entry of the scorer's audit log, written for every score increase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEvent {
    pub time: DateTime<Utc>,
    pub score: f64,
    pub probability: f64,
    pub reasons: Vec<String>,
}
