//! Ride API payloads

use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, Utc};

use corridor_core::{GeoPoint, JourneyUpdate, RiskEvent, Severity};

use super::risk_log::RiskLogEntry;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
pub struct LocationPayload {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lon: f64,
}

impl From<LocationPayload> for GeoPoint {
    fn from(p: LocationPayload) -> Self {
        GeoPoint::new(p.lat, p.lon)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartRideRequest {
    #[validate(nested)]
    pub start_location: LocationPayload,
    #[validate(nested)]
    pub end_location: LocationPayload,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRideResponse {
    pub session_id: String,
    pub status: &'static str,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryRequest {
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    #[validate(nested)]
    pub location: LocationPayload,
    #[validate(range(min = 0.0))]
    pub speed: f64,
    #[validate(range(min = 0.0))]
    pub accuracy: Option<f64>,
    /// Sender clock, epoch milliseconds
    pub timestamp: Option<i64>,
}

/// Reply to a telemetry post: the scored update, or a dropped-sample notice
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TelemetryResponse {
    Accepted(JourneyUpdate),
    Dropped(DroppedSample),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedSample {
    pub session_id: String,
    pub accepted: bool,
    pub last_timestamp: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EndRideRequest {
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndRideResponse {
    pub session_id: String,
    pub status: &'static str,
    pub peak_severity: Severity,
    pub purged: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub time: DateTime<Utc>,
    pub score: f64,
    pub probability: Option<f64>,
    pub reasons: Vec<String>,
}

impl From<RiskEvent> for HistoryEntry {
    fn from(e: RiskEvent) -> Self {
        Self {
            time: e.time,
            score: e.score,
            probability: Some(e.probability),
            reasons: e.reasons,
        }
    }
}

impl From<RiskLogEntry> for HistoryEntry {
    fn from(e: RiskLogEntry) -> Self {
        Self {
            time: e.timestamp,
            score: e.risk_score,
            probability: None,
            reasons: e.reason_list(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub session_id: String,
    /// True when served from the live journey rather than storage
    pub live: bool,
    pub events: Vec<HistoryEntry>,
}
