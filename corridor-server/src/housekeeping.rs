//! Background housekeeping: rehydrate live journeys at startup and abandon
//! journeys that went silent.

use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use corridor_core::{JourneyClosure, JourneyStatus};

use crate::events::JourneyEvent;
use crate::models::Journey;
use crate::AppState;

/// Spawn the periodic stale-journey sweep
pub fn spawn(state: AppState) -> tokio::task::JoinHandle<()> {
    let period = Duration::from_secs(state.config.sweep_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let closed = sweep_once(&state, Utc::now()).await;
            if closed > 0 {
                tracing::info!("Housekeeping closed {} journey(s)", closed);
            }
        }
    })
}

/// Abandon every live journey idle since before `now - stale_after`, and
/// retry closures an earlier attempt failed to persist. Returns the number
/// of journeys closed in storage; failures stay registered for the next tick.
pub async fn sweep_once(state: &AppState, now: DateTime<Utc>) -> usize {
    let cutoff = now - state.config.stale_after();
    let closures = state.registry.sweep_stale(cutoff);
    let mut closed = 0;

    for closure in &closures {
        if let Err(e) = persist_closure(&state.pool, closure).await {
            tracing::error!("Failed to close journey {}: {}", closure.session_id, e);
            continue;
        }
        state.registry.remove(&closure.session_id);
        state.events.publish(JourneyEvent::closed(closure));
        if closure.status == JourneyStatus::Abandoned {
            tracing::warn!(
                "Journey {} abandoned after inactivity (peak {})",
                closure.session_id,
                closure.peak_severity
            );
        }
        closed += 1;
    }

    closed
}

/// Write a terminal transition: hard delete for purgeable journeys,
/// final status otherwise
pub async fn persist_closure(pool: &SqlitePool, closure: &JourneyClosure) -> Result<(), sqlx::Error> {
    if closure.purge {
        Journey::purge(pool, &closure.session_id).await
    } else {
        Journey::update_status(pool, &closure.session_id, closure.status)
            .await
            .map(|_| ())
    }
}

/// Outcome of startup rehydration
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Rehydration {
    pub resumed: usize,
    pub abandoned: usize,
}

/// Reload ACTIVE journeys from storage. Those already past the stale cutoff
/// are closed as ABANDONED instead of being resumed.
pub async fn rehydrate(state: &AppState, now: DateTime<Utc>) -> Result<Rehydration, sqlx::Error> {
    let cutoff = now - state.config.stale_after();
    let mut outcome = Rehydration::default();

    for row in Journey::list_active(&state.pool).await? {
        let last_sample = row.last_sample_at(&state.pool).await?;
        let last_activity = last_sample.unwrap_or(row.start_time);

        if last_activity < cutoff {
            Journey::update_status(&state.pool, &row.ride_session_id, JourneyStatus::Abandoned).await?;
            tracing::info!("Journey {} was stale at startup, marked abandoned", row.ride_session_id);
            outcome.abandoned += 1;
            continue;
        }

        state
            .registry
            .resume(row.identity(), last_sample.map(|t| t.timestamp_millis()));
        outcome.resumed += 1;
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use corridor_core::{GeoPoint, JourneyIdentity, TelemetrySample};

    use crate::config::Config;
    use crate::db::test_pool;
    use crate::models::Telemetry;

    async fn test_state() -> AppState {
        AppState::new(test_pool().await, Config::default(), Default::default())
    }

    fn identity(id: &str, started_at: DateTime<Utc>) -> JourneyIdentity {
        JourneyIdentity::new(id, GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0), started_at)
    }

    #[tokio::test]
    async fn test_sweep_marks_stale_journey_abandoned() {
        let state = test_state().await;
        let started = Utc::now() - ChronoDuration::hours(3);
        let ident = identity("stale", started);
        Journey::create(&state.pool, &ident).await.unwrap();
        state.registry.start(ident);
        let mut rx = state.events.subscribe();

        let n = sweep_once(&state, Utc::now()).await;

        assert_eq!(n, 1);
        assert!(state.registry.get("stale").is_none());
        let row = Journey::find_by_id(&state.pool, "stale").await.unwrap().unwrap();
        assert_eq!(row.final_state, "ABANDONED");
        assert!(row.end_time.is_some());
        assert_eq!(rx.recv().await.unwrap().name(), "ride_abandoned");
    }

    #[tokio::test]
    async fn test_sweep_leaves_recent_journey() {
        let state = test_state().await;
        let ident = identity("fresh", Utc::now());
        Journey::create(&state.pool, &ident).await.unwrap();
        state.registry.start(ident);

        assert_eq!(sweep_once(&state, Utc::now()).await, 0);
        assert!(state.registry.get("fresh").is_some());
    }

    #[tokio::test]
    async fn test_sweep_failure_is_isolated_and_retried() {
        let state = test_state().await;
        let started = Utc::now() - ChronoDuration::hours(3);
        for id in ["stale-a", "stale-b"] {
            let ident = identity(id, started);
            Journey::create(&state.pool, &ident).await.unwrap();
            state.registry.start(ident);
        }
        sqlx::query(
            "CREATE TRIGGER refuse_stale_a BEFORE UPDATE ON rides \
             WHEN OLD.ride_session_id = 'stale-a' \
             BEGIN SELECT RAISE(ABORT, 'write refused'); END"
        )
        .execute(&state.pool)
        .await
        .unwrap();
        let mut rx = state.events.subscribe();

        assert_eq!(sweep_once(&state, Utc::now()).await, 1);

        let b = Journey::find_by_id(&state.pool, "stale-b").await.unwrap().unwrap();
        assert_eq!(b.final_state, "ABANDONED");
        assert!(state.registry.get("stale-b").is_none());

        // Unpersisted closure stays registered and closed to telemetry
        let a = Journey::find_by_id(&state.pool, "stale-a").await.unwrap().unwrap();
        assert_eq!(a.final_state, "ACTIVE");
        let live = state.registry.get("stale-a").unwrap();
        assert_eq!(live.lock().status(), JourneyStatus::Abandoned);

        sqlx::query("DROP TRIGGER refuse_stale_a").execute(&state.pool).await.unwrap();
        assert_eq!(sweep_once(&state, Utc::now()).await, 1);

        let a = Journey::find_by_id(&state.pool, "stale-a").await.unwrap().unwrap();
        assert_eq!(a.final_state, "ABANDONED");
        assert!(state.registry.is_empty());
        assert_eq!(rx.recv().await.unwrap().name(), "ride_abandoned");
        assert_eq!(rx.recv().await.unwrap().name(), "ride_abandoned");
    }

    #[tokio::test]
    async fn test_rehydrate_resumes_recent_and_abandons_stale() {
        let state = test_state().await;
        let now = Utc::now();

        let recent = identity("recent", now - ChronoDuration::minutes(10));
        Journey::create(&state.pool, &recent).await.unwrap();

        // Started long ago but reported a sample a minute ago
        let active = identity("active", now - ChronoDuration::hours(5));
        Journey::create(&state.pool, &active).await.unwrap();
        let last = now - ChronoDuration::minutes(1);
        let mut machine = corridor_core::JourneyStateMachine::start(active.clone());
        let update = machine
            .ingest_at(
                TelemetrySample::new(GeoPoint::new(0.0, 0.01), 5.0)
                    .with_accuracy(5.0)
                    .with_timestamp(last.timestamp_millis()),
                last,
            )
            .unwrap();
        Telemetry::record(&state.pool, &update, Some(5.0)).await.unwrap();

        let stale = identity("stale", now - ChronoDuration::hours(4));
        Journey::create(&state.pool, &stale).await.unwrap();

        let outcome = rehydrate(&state, now).await.unwrap();

        assert_eq!(outcome, Rehydration { resumed: 2, abandoned: 1 });
        assert!(state.registry.get("recent").is_some());
        let resumed = state.registry.get("active").unwrap();
        assert_eq!(resumed.lock().last_timestamp(), Some(last.timestamp_millis()));
        assert!(state.registry.get("stale").is_none());

        let row = Journey::find_by_id(&state.pool, "stale").await.unwrap().unwrap();
        assert_eq!(row.final_state, "ABANDONED");
    }
}
