//! Live journey registry
//!
//! One `JourneyStateMachine` per session behind its own lock, so samples for
//! different rides never contend. Lock order: never take the map lock while
//! holding a journey lock.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use corridor_core::{
    JourneyClosure, JourneyIdentity, JourneySnapshot, JourneyStateMachine, ScoringThresholds,
};

pub type SharedJourney = Arc<Mutex<JourneyStateMachine>>;

pub struct JourneyRegistry {
    journeys: RwLock<HashMap<String, SharedJourney>>,
    thresholds: ScoringThresholds,
}

impl JourneyRegistry {
    pub fn new(thresholds: ScoringThresholds) -> Self {
        Self {
            journeys: RwLock::new(HashMap::new()),
            thresholds,
        }
    }

    /// Register a fresh journey, replacing any live one under the same id
    pub fn start(&self, identity: JourneyIdentity) -> SharedJourney {
        let session_id = identity.session_id.clone();
        let journey = Arc::new(Mutex::new(JourneyStateMachine::start_with_thresholds(
            identity,
            self.thresholds.clone(),
        )));
        if self.journeys.write().insert(session_id.clone(), journey.clone()).is_some() {
            tracing::warn!("Journey {} restarted, previous live state replaced", session_id);
        }
        journey
    }

    /// Re-register a journey loaded from storage. A journey already live
    /// under the same id wins and is returned unchanged.
    pub fn resume(&self, identity: JourneyIdentity, last_timestamp: Option<i64>) -> SharedJourney {
        let thresholds = &self.thresholds;
        self.journeys
            .write()
            .entry(identity.session_id.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(JourneyStateMachine::resume(
                    identity,
                    thresholds.clone(),
                    last_timestamp,
                )))
            })
            .clone()
    }

    pub fn get(&self, session_id: &str) -> Option<SharedJourney> {
        self.journeys.read().get(session_id).cloned()
    }

    /// Existing journey, or a new one built from `identity`. The flag is
    /// true when the journey was created by this call.
    pub fn get_or_start(&self, identity: JourneyIdentity) -> (SharedJourney, bool) {
        if let Some(existing) = self.get(&identity.session_id) {
            return (existing, false);
        }

        let mut journeys = self.journeys.write();
        if let Some(existing) = journeys.get(&identity.session_id) {
            return (existing.clone(), false);
        }
        let session_id = identity.session_id.clone();
        let journey = Arc::new(Mutex::new(JourneyStateMachine::start_with_thresholds(
            identity,
            self.thresholds.clone(),
        )));
        journeys.insert(session_id, journey.clone());
        (journey, true)
    }

    pub fn remove(&self, session_id: &str) -> Option<SharedJourney> {
        self.journeys.write().remove(session_id)
    }

    pub fn len(&self) -> usize {
        self.journeys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point-in-time view of every live journey, oldest first
    pub fn snapshots(&self) -> Vec<JourneySnapshot> {
        let journeys: Vec<SharedJourney> = self.journeys.read().values().cloned().collect();
        let mut snapshots: Vec<JourneySnapshot> =
            journeys.iter().map(|j| j.lock().snapshot()).collect();
        snapshots.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        snapshots
    }

    /// Abandon every journey with no activity since `cutoff`.
    ///
    /// Returns the closure of every terminal journey still registered, the
    /// newly abandoned ones included. They stay registered, and so reject
    /// telemetry, until the caller has persisted the closure and removed
    /// them.
    pub fn sweep_stale(&self, cutoff: DateTime<Utc>) -> Vec<JourneyClosure> {
        let journeys: Vec<SharedJourney> = self.journeys.read().values().cloned().collect();
        let mut closures = Vec::new();

        for journey in journeys {
            let mut journey = journey.lock();
            if !journey.status().is_terminal() && journey.last_activity() < cutoff {
                journey.abandon();
            }
            if let Some(closure) = journey.closure() {
                closures.push(closure);
            }
        }

        closures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use corridor_core::{GeoPoint, JourneyStatus, TelemetrySample};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn identity(id: &str, started_at: DateTime<Utc>) -> JourneyIdentity {
        JourneyIdentity::new(id, GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0), started_at)
    }

    #[test]
    fn test_start_and_get() {
        let registry = JourneyRegistry::new(ScoringThresholds::default());
        registry.start(identity("r1", t0()));

        assert_eq!(registry.len(), 1);
        let journey = registry.get("r1").unwrap();
        assert_eq!(journey.lock().session_id(), "r1");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_get_or_start_reuses_existing() {
        let registry = JourneyRegistry::new(ScoringThresholds::default());

        let (first, created) = registry.get_or_start(identity("r1", t0()));
        assert!(created);
        let (second, created) = registry.get_or_start(identity("r1", t0() + Duration::minutes(5)));
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.lock().identity().started_at, t0());
    }

    #[test]
    fn test_remove() {
        let registry = JourneyRegistry::new(ScoringThresholds::default());
        registry.start(identity("r1", t0()));
        assert!(registry.remove("r1").is_some());
        assert!(registry.remove("r1").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_resume_keeps_replay_guard() {
        let registry = JourneyRegistry::new(ScoringThresholds::default());
        let last = (t0() + Duration::seconds(30)).timestamp_millis();
        let journey = registry.resume(identity("r1", t0()), Some(last));

        let stale = TelemetrySample::new(GeoPoint::new(0.0, 0.01), 5.0).with_timestamp(last);
        assert!(journey.lock().ingest_at(stale, t0() + Duration::seconds(40)).is_none());
    }

    #[test]
    fn test_sweep_abandons_only_idle_journeys() {
        let registry = JourneyRegistry::new(ScoringThresholds::default());
        let idle = registry.start(identity("idle", t0()));
        let busy = registry.start(identity("busy", t0()));

        let recent = t0() + Duration::minutes(100);
        let sample = TelemetrySample::new(GeoPoint::new(0.0, 0.01), 5.0)
            .with_accuracy(5.0)
            .with_timestamp(recent.timestamp_millis());
        busy.lock().ingest_at(sample, recent).unwrap();

        let closures = registry.sweep_stale(t0() + Duration::minutes(60));

        assert_eq!(closures.len(), 1);
        assert_eq!(closures[0].session_id, "idle");
        assert_eq!(closures[0].status, JourneyStatus::Abandoned);
        assert!(!closures[0].purge);
        assert_eq!(idle.lock().status(), JourneyStatus::Abandoned);
        // Stays registered until the caller persists the closure
        assert!(registry.get("idle").is_some());
        assert!(registry.get("busy").is_some());

        // Reported again while still registered
        let again = registry.sweep_stale(t0() + Duration::minutes(60));
        assert_eq!(again, closures);
    }

    #[test]
    fn test_resume_never_replaces_live_journey() {
        let registry = JourneyRegistry::new(ScoringThresholds::default());
        let live = registry.start(identity("r1", t0()));
        let sample = TelemetrySample::new(GeoPoint::new(0.0, 0.01), 40.0)
            .with_accuracy(5.0)
            .with_timestamp((t0() + Duration::seconds(10)).timestamp_millis());
        live.lock().ingest_at(sample, t0() + Duration::seconds(10)).unwrap();

        let resumed = registry.resume(identity("r1", t0()), None);

        assert!(Arc::ptr_eq(&live, &resumed));
        assert_eq!(resumed.lock().current_risk(), 10.0);
        assert_eq!(resumed.lock().path().len(), 2);
    }

    #[test]
    fn test_snapshots_sorted_by_start() {
        let registry = JourneyRegistry::new(ScoringThresholds::default());
        registry.start(identity("later", t0() + Duration::minutes(10)));
        registry.start(identity("earlier", t0()));

        let ids: Vec<String> = registry.snapshots().into_iter().map(|s| s.session_id).collect();
        assert_eq!(ids, vec!["earlier".to_string(), "later".to_string()]);
    }
}
