//! Journey State Machine
//!
//! ACTIVE → {COMPLETED, ABANDONED}. Owns one RiskScorer, filters stale and
//! duplicate samples, keeps the derived counters current and packages each
//! scored sample for the caller. Never touches storage.

use chrono::{DateTime, Utc};

use super::eta;
use super::types::{JourneyClosure, JourneyIdentity, JourneySnapshot, JourneyStatus, JourneyUpdate};
use crate::logic::risk::{
    DerivedState, GeoPoint, RiskEvent, RiskScorer, ScoringThresholds, Severity, TelemetrySample,
};

/// Scoring state of a journey before a sample, see [`JourneyStateMachine::checkpoint`]
#[derive(Debug, Clone)]
pub struct JourneyCheckpoint {
    scorer: RiskScorer,
    derived: DerivedState,
    path_len: usize,
    last_location: GeoPoint,
    last_timestamp: Option<i64>,
    current_risk: f64,
    current_severity: Severity,
    peak_severity: Severity,
}

#[derive(Debug, Clone)]
pub struct JourneyStateMachine {
    identity: JourneyIdentity,
    status: JourneyStatus,
    scorer: RiskScorer,
    derived: DerivedState,
    path: Vec<GeoPoint>,
    last_location: GeoPoint,
    last_timestamp: Option<i64>,
    current_risk: f64,
    current_severity: Severity,
    peak_severity: Severity,
}

impl JourneyStateMachine {
    /// New ACTIVE journey with default thresholds
    pub fn start(identity: JourneyIdentity) -> Self {
        Self::start_with_thresholds(identity, ScoringThresholds::default())
    }

    pub fn start_with_thresholds(identity: JourneyIdentity, thresholds: ScoringThresholds) -> Self {
        let scorer = RiskScorer::with_thresholds(identity.start, identity.end, thresholds);
        Self {
            path: vec![identity.start],
            last_location: identity.start,
            identity,
            status: JourneyStatus::Active,
            scorer,
            derived: DerivedState::default(),
            last_timestamp: None,
            current_risk: 0.0,
            current_severity: Severity::Normal,
            peak_severity: Severity::Normal,
        }
    }

    /// Rebuild a live journey after a restart. Scoring state starts fresh;
    /// the replay guard continues from the last stored sample.
    pub fn resume(identity: JourneyIdentity, thresholds: ScoringThresholds, last_timestamp: Option<i64>) -> Self {
        let mut journey = Self::start_with_thresholds(identity, thresholds);
        journey.last_timestamp = last_timestamp;
        journey
    }

    /// Ingest one sample, using the wall clock for the ETA check and for
    /// samples that carry no timestamp
    pub fn ingest(&mut self, sample: TelemetrySample) -> Option<JourneyUpdate> {
        self.ingest_at(sample, Utc::now())
    }

    /// Ingest one sample as of `now`.
    ///
    /// Returns `None` without touching any state when the journey is terminal
    /// or the sample is not newer than the last accepted one.
    pub fn ingest_at(&mut self, sample: TelemetrySample, now: DateTime<Utc>) -> Option<JourneyUpdate> {
        if self.status.is_terminal() {
            log::warn!(
                "Journey {} is {}, ignoring telemetry",
                self.identity.session_id,
                self.status
            );
            return None;
        }

        // a. Duplicate / replay filter
        let timestamp = sample.timestamp.unwrap_or_else(|| now.timestamp_millis());
        if let Some(last) = self.last_timestamp {
            if timestamp <= last {
                log::warn!(
                    "Journey {}: dropped duplicate/late sample {} (last {})",
                    self.identity.session_id,
                    timestamp,
                    last
                );
                return None;
            }
        }

        // b. Accept
        self.last_timestamp = Some(timestamp);
        self.path.push(sample.location);
        self.last_location = sample.location;

        // c. Stop counter
        if sample.speed < self.thresholds().stop_speed_mps {
            self.derived.consecutive_stops += 1;
        } else {
            self.derived.consecutive_stops = 0;
        }

        // d. ETA
        self.derived.is_overdue = self.check_overdue(now);

        // e. Trend
        let distance = sample.location.degree_distance(&self.identity.end);
        if distance > self.derived.last_distance {
            self.derived.moving_away_streak += 1;
        } else {
            self.derived.moving_away_streak = 0;
        }
        self.derived.previous_distance = self.derived.last_distance;
        self.derived.last_distance = distance;

        // f. Score
        let sample = TelemetrySample {
            timestamp: Some(timestamp),
            ..sample
        };
        let assessment = self.scorer.score(&self.derived, &sample);

        // g. Cache
        self.current_risk = assessment.score;
        self.current_severity = assessment.severity;
        self.peak_severity = self.peak_severity.max(assessment.severity);

        // h. Envelope
        Some(JourneyUpdate {
            session_id: self.identity.session_id.clone(),
            location: sample.location,
            risk_score: assessment.score,
            risk_probability: assessment.probability,
            severity: assessment.severity,
            reasons: assessment.reasons,
            speed: sample.speed,
            timestamp,
        })
    }

    /// ACTIVE → COMPLETED. `purge` is set when the journey never left NORMAL.
    pub fn end(&mut self) -> Option<JourneyClosure> {
        let closure = self.close(JourneyStatus::Completed)?;
        if closure.purge {
            log::info!(
                "Journey {} completed without incident, data may be purged",
                closure.session_id
            );
        } else {
            log::info!(
                "Journey {} completed (peak {})",
                closure.session_id,
                closure.peak_severity
            );
        }
        Some(closure)
    }

    /// ACTIVE → ABANDONED. Abandoned journeys are never purged.
    pub fn abandon(&mut self) -> Option<JourneyClosure> {
        let closure = self.close(JourneyStatus::Abandoned)?;
        log::info!("Journey {} abandoned", closure.session_id);
        Some(closure)
    }

    fn close(&mut self, status: JourneyStatus) -> Option<JourneyClosure> {
        if self.status.is_terminal() {
            return None;
        }
        self.status = status;
        self.closure()
    }

    /// Closure of a terminal journey, `None` while still ACTIVE. Lets a
    /// caller retry persisting a transition that already happened.
    pub fn closure(&self) -> Option<JourneyClosure> {
        if !self.status.is_terminal() {
            return None;
        }
        Some(JourneyClosure {
            session_id: self.identity.session_id.clone(),
            status: self.status,
            peak_severity: self.peak_severity,
            purge: self.status == JourneyStatus::Completed && self.peak_severity == Severity::Normal,
        })
    }

    /// Capture the state `ingest` mutates
    pub fn checkpoint(&self) -> JourneyCheckpoint {
        JourneyCheckpoint {
            scorer: self.scorer.clone(),
            derived: self.derived.clone(),
            path_len: self.path.len(),
            last_location: self.last_location,
            last_timestamp: self.last_timestamp,
            current_risk: self.current_risk,
            current_severity: self.current_severity,
            peak_severity: self.peak_severity,
        }
    }

    /// Undo every sample accepted since `checkpoint` was taken, e.g. when
    /// the caller could not persist it
    pub fn rollback(&mut self, checkpoint: JourneyCheckpoint) {
        self.scorer = checkpoint.scorer;
        self.derived = checkpoint.derived;
        self.path.truncate(checkpoint.path_len);
        self.last_location = checkpoint.last_location;
        self.last_timestamp = checkpoint.last_timestamp;
        self.current_risk = checkpoint.current_risk;
        self.current_severity = checkpoint.current_severity;
        self.peak_severity = checkpoint.peak_severity;
    }

    /// Overdue as of `now`
    pub fn check_overdue(&self, now: DateTime<Utc>) -> bool {
        let elapsed = (now - self.identity.started_at).num_milliseconds() as f64 / 1000.0;
        eta::is_overdue(&self.identity.start, &self.identity.end, elapsed, self.thresholds())
    }

    /// Time of the last accepted sample, or the start time before any
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_timestamp
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or(self.identity.started_at)
    }

    pub fn snapshot(&self) -> JourneySnapshot {
        JourneySnapshot {
            session_id: self.identity.session_id.clone(),
            status: self.status,
            start: self.identity.start,
            end: self.identity.end,
            started_at: self.identity.started_at,
            last_location: self.last_location,
            last_timestamp: self.last_timestamp,
            risk_score: self.current_risk,
            severity: self.current_severity,
            peak_severity: self.peak_severity,
            samples: self.path.len() - 1,
        }
    }

    pub fn identity(&self) -> &JourneyIdentity {
        &self.identity
    }

    pub fn session_id(&self) -> &str {
        &self.identity.session_id
    }

    pub fn status(&self) -> JourneyStatus {
        self.status
    }

    pub fn current_risk(&self) -> f64 {
        self.current_risk
    }

    pub fn current_severity(&self) -> Severity {
        self.current_severity
    }

    pub fn peak_severity(&self) -> Severity {
        self.peak_severity
    }

    pub fn derived(&self) -> &DerivedState {
        &self.derived
    }

    pub fn path(&self) -> &[GeoPoint] {
        &self.path
    }

    pub fn last_location(&self) -> GeoPoint {
        self.last_location
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.last_timestamp
    }

    pub fn scorer(&self) -> &RiskScorer {
        &self.scorer
    }

    /// Audit log of score increases
    pub fn history(&self) -> Vec<RiskEvent> {
        self.scorer.history().iter().cloned().collect()
    }

    pub fn thresholds(&self) -> &ScoringThresholds {
        self.scorer.thresholds()
    }
}

// ============================================================================
// TESTS
// ============================================================================
