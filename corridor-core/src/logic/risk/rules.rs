//! Risk Rules & Thresholds
//!
//! Weights, limits and severity cut-offs used by the scorer.
//! Constants only, plus the runtime-adjustable threshold set.

use serde::{Deserialize, Serialize};

// ============================================================================
// RULE LIMITS
// ============================================================================

/// Cross-track deviation tolerated before the corridor rule fires (meters)
pub const CORRIDOR_WIDTH_M: f64 = 2000.0;

/// Above this speed the sample is unsafe (~130 km/h)
pub const MAX_SPEED_MPS: f64 = 36.0;

/// Below this speed the rider counts as stopped
pub const STOP_SPEED_MPS: f64 = 2.0;

/// Stop rule fires once the stop counter exceeds this many ticks
pub const STOP_TICKS_MIN: u32 = 24;

/// Direction rule fires once the moving-away streak exceeds this
pub const MOVING_AWAY_STREAK_MIN: u32 = 5;

/// Fixes with worse accuracy than this are not used for geometry (meters)
pub const MAX_TRUSTED_ACCURACY_M: f64 = 50.0;

// ============================================================================
// WEIGHTS
// ============================================================================

pub const WEIGHT_DEVIATION: f64 = 15.0;
pub const WEIGHT_SPEED: f64 = 10.0;
pub const WEIGHT_STOP: f64 = 15.0;
pub const WEIGHT_DIRECTION: f64 = 5.0;
pub const WEIGHT_OVERDUE: f64 = 20.0;

// ============================================================================
// SCORE DYNAMICS
// ============================================================================

pub const MAX_RISK: f64 = 100.0;

/// Score lost on every sample where no rule fires
pub const DECAY_RATE: f64 = 2.0;

pub const ELEVATED_THRESHOLD: f64 = 30.0;
pub const MONITORING_THRESHOLD: f64 = 60.0;
pub const CRITICAL_THRESHOLD: f64 = 80.0;

/// Logistic curve: probability 0.5 at this score
pub const SIGMOID_MIDPOINT: f64 = 50.0;
pub const SIGMOID_STEEPNESS: f64 = 0.1;

// ============================================================================
// SMOOTHING
// ============================================================================

pub const SMOOTHING_WINDOW: usize = 5;

/// Median smoothing kicks in at this many fixes
pub const SMOOTHING_MIN_FIXES: usize = 3;

// ============================================================================
// ETA
// ============================================================================

/// Naive travel speed used for the expected duration
pub const ASSUMED_TRAVEL_SPEED_MPS: f64 = 8.3;

/// Rough meters per degree, applied to degree-space distances
pub const METERS_PER_DEGREE: f64 = 111_000.0;

pub const OVERDUE_FACTOR: f64 = 2.0;

/// Never overdue before this many seconds
pub const OVERDUE_FLOOR_SECS: f64 = 300.0;

/// Audit entries kept per journey
pub const HISTORY_LIMIT: usize = 1000;

// ============================================================================
// CONFIGURABLE THRESHOLDS
// ============================================================================

/// Full set of scoring parameters (defaults = constants above)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringThresholds {
    pub corridor_width_m: f64,
    pub max_speed_mps: f64,
    pub stop_speed_mps: f64,
    pub stop_ticks_min: u32,
    pub moving_away_streak_min: u32,
    pub max_trusted_accuracy_m: f64,

    pub weight_deviation: f64,
    pub weight_speed: f64,
    pub weight_stop: f64,
    pub weight_direction: f64,
    pub weight_overdue: f64,

    pub max_risk: f64,
    pub decay_rate: f64,
    pub elevated_min: f64,
    pub monitoring_min: f64,
    pub critical_min: f64,
    pub sigmoid_midpoint: f64,
    pub sigmoid_steepness: f64,

    pub smoothing_window: usize,
    pub smoothing_min_fixes: usize,

    pub travel_speed_mps: f64,
    pub meters_per_degree: f64,
    pub overdue_factor: f64,
    pub overdue_floor_secs: f64,

    pub history_limit: usize,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            corridor_width_m: CORRIDOR_WIDTH_M,
            max_speed_mps: MAX_SPEED_MPS,
            stop_speed_mps: STOP_SPEED_MPS,
            stop_ticks_min: STOP_TICKS_MIN,
            moving_away_streak_min: MOVING_AWAY_STREAK_MIN,
            max_trusted_accuracy_m: MAX_TRUSTED_ACCURACY_M,

            weight_deviation: WEIGHT_DEVIATION,
            weight_speed: WEIGHT_SPEED,
            weight_stop: WEIGHT_STOP,
            weight_direction: WEIGHT_DIRECTION,
            weight_overdue: WEIGHT_OVERDUE,

            max_risk: MAX_RISK,
            decay_rate: DECAY_RATE,
            elevated_min: ELEVATED_THRESHOLD,
            monitoring_min: MONITORING_THRESHOLD,
            critical_min: CRITICAL_THRESHOLD,
            sigmoid_midpoint: SIGMOID_MIDPOINT,
            sigmoid_steepness: SIGMOID_STEEPNESS,

            smoothing_window: SMOOTHING_WINDOW,
            smoothing_min_fixes: SMOOTHING_MIN_FIXES,

            travel_speed_mps: ASSUMED_TRAVEL_SPEED_MPS,
            meters_per_degree: METERS_PER_DEGREE,
            overdue_factor: OVERDUE_FACTOR,
            overdue_floor_secs: OVERDUE_FLOOR_SECS,

            history_limit: HISTORY_LIMIT,
        }
    }
}

impl ScoringThresholds {
    /// Narrow corridor, earlier escalation
    pub fn strict() -> Self {
        Self {
            corridor_width_m: 1000.0,
            max_speed_mps: 30.0,
            stop_ticks_min: 12,
            elevated_min: 20.0,
            monitoring_min: 45.0,
            critical_min: 70.0,
            ..Default::default()
        }
    }

    /// Wide corridor for rural trips, slower escalation
    pub fn lenient() -> Self {
        Self {
            corridor_width_m: 5000.0,
            max_speed_mps: 42.0,
            stop_ticks_min: 48,
            decay_rate: 3.0,
            ..Default::default()
        }
    }

    /// Reject parameter sets the scorer cannot work with
    pub fn validate(&self) -> Result<(), String> {
        if !(self.max_risk > 0.0) {
            return Err(format!("max risk must be positive, got {}", self.max_risk));
        }
        if !(self.elevated_min < self.monitoring_min && self.monitoring_min < self.critical_min) {
            return Err(format!(
                "severity cut-offs must increase: elevated {} < monitoring {} < critical {}",
                self.elevated_min, self.monitoring_min, self.critical_min
            ));
        }
        if self.critical_min > self.max_risk {
            return Err(format!(
                "critical cut-off {} is above max risk {}",
                self.critical_min, self.max_risk
            ));
        }
        if self.smoothing_window == 0 {
            return Err("smoothing window must hold at least one fix".to_string());
        }
        if self.smoothing_min_fixes > self.smoothing_window {
            return Err(format!(
                "smoothing needs {} fixes but the window holds {}",
                self.smoothing_min_fixes, self.smoothing_window
            ));
        }
        if self.travel_speed_mps <= 0.0 {
            return Err("travel speed must be positive".to_string());
        }
        if self.decay_rate < 0.0 {
            return Err("decay rate cannot be negative".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
