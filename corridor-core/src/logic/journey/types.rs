//! Journey Types
//!
//! Identity, lifecycle status and the records a journey hands back to its
//! caller for persistence and broadcast.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::risk::{GeoPoint, Severity};

// ============================================================================
// IDENTITY
// ============================================================================

/// Immutable identity of one journey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyIdentity {
    /// Caller-issued session identifier
    pub session_id: String,
    pub start: GeoPoint,
    pub end: GeoPoint,
    pub started_at: DateTime<Utc>,
}

impl JourneyIdentity {
    pub fn new(session_id: impl Into<String>, start: GeoPoint, end: GeoPoint, started_at: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            start,
            end,
            started_at,
        }
    }

    pub fn starting_now(session_id: impl Into<String>, start: GeoPoint, end: GeoPoint) -> Self {
        Self::new(session_id, start, end, Utc::now())
    }
}

// ============================================================================
// STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JourneyStatus {
    /// Accepting telemetry
    Active,
    /// Ended normally by the rider
    Completed,
    /// Went silent and was closed by housekeeping
    Abandoned,
}

impl JourneyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JourneyStatus::Active => "ACTIVE",
            JourneyStatus::Completed => "COMPLETED",
            JourneyStatus::Abandoned => "ABANDONED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JourneyStatus::Active)
    }
}

impl std::fmt::Display for JourneyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JourneyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(JourneyStatus::Active),
            "COMPLETED" => Ok(JourneyStatus::Completed),
            "ABANDONED" => Ok(JourneyStatus::Abandoned),
            other => Err(format!("unknown journey status '{}'", other)),
        }
    }
}

// ============================================================================
// OUTPUT RECORDS
// ============================================================================

/// Envelope returned for every accepted sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyUpdate {
    pub session_id: String,
    /// Raw (unsmoothed) fix
    pub location: GeoPoint,
    pub risk_score: f64,
    pub risk_probability: f64,
    pub severity: Severity,
    pub reasons: Vec<String>,
    pub speed: f64,
    /// Accepted timestamp, epoch milliseconds
    pub timestamp: i64,
}

/// Result of a terminal transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyClosure {
    pub session_id: String,
    pub status: JourneyStatus,
    /// Highest severity reached while active
    pub peak_severity: Severity,
    /// Storage may hard-delete this journey's rows
    pub purge: bool,
}

/// Read-only view of a live journey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneySnapshot {
    pub session_id: String,
    pub status: JourneyStatus,
    pub start: GeoPoint,
    pub end: GeoPoint,
    pub started_at: DateTime<Utc>,
    pub last_location: GeoPoint,
    pub last_timestamp: Option<i64>,
    pub risk_score: f64,
    pub severity: Severity,
    pub peak_severity: Severity,
    pub samples: usize,
}
