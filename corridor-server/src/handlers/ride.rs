//! Ride handlers

use axum::{extract::{State, Path}, Json};
use uuid::Uuid;
use validator::Validate;

use corridor_core::{GeoPoint, JourneyIdentity, JourneySnapshot, JourneyStatus, TelemetrySample};

use crate::{AppState, AppResult, AppError};
use crate::events::JourneyEvent;
use crate::housekeeping;
use crate::models::{
    DroppedSample, EndRideRequest, EndRideResponse, HistoryEntry, HistoryResponse, Journey,
    RiskLogEntry, StartRideRequest, StartRideResponse, Telemetry, TelemetryRequest,
    TelemetryResponse,
};
use crate::registry::SharedJourney;

/// Start a new journey
pub async fn start(
    State(state): State<AppState>,
    Json(req): Json<StartRideRequest>,
) -> AppResult<Json<StartRideResponse>> {
    req.validate()?;

    let identity = JourneyIdentity::starting_now(
        Uuid::new_v4().to_string(),
        req.start_location.into(),
        req.end_location.into(),
    );

    Journey::create(&state.pool, &identity).await?;
    state.registry.start(identity.clone());
    state.events.publish(JourneyEvent::started(&identity));

    tracing::info!("Journey {} started", identity.session_id);

    Ok(Json(StartRideResponse {
        session_id: identity.session_id,
        status: "STARTED",
    }))
}

/// Live journey for `session_id`, starting one implicitly when the session
/// has never been seen. The storage row always exists before the journey is
/// registered, and a journey already live is never replaced.
async fn live_or_implicit(
    state: &AppState,
    session_id: &str,
    location: GeoPoint,
) -> AppResult<SharedJourney> {
    if let Some(journey) = state.registry.get(session_id) {
        return Ok(journey);
    }

    let identity = JourneyIdentity::starting_now(session_id, location, location);
    if Journey::create_if_absent(&state.pool, &identity).await? {
        let (journey, _) = state.registry.get_or_start(identity.clone());
        state.events.publish(JourneyEvent::started(&identity));
        tracing::info!("Journey {} started implicitly by telemetry", session_id);
        return Ok(journey);
    }

    let row = Journey::find_by_id(&state.pool, session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Journey not found".to_string()))?;
    if row.final_state != JourneyStatus::Active.as_str() {
        return Err(AppError::NotFound(format!("Journey {} is {}", session_id, row.final_state)));
    }
    let last_sample = row.last_sample_at(&state.pool).await?;
    Ok(state
        .registry
        .resume(row.identity(), last_sample.map(|t| t.timestamp_millis())))
}

/// Ingest one telemetry sample
pub async fn telemetry(
    State(state): State<AppState>,
    Json(req): Json<TelemetryRequest>,
) -> AppResult<Json<TelemetryResponse>> {
    req.validate()?;

    let location: GeoPoint = req.location.into();
    let journey = live_or_implicit(&state, &req.session_id, location).await?;

    let mut sample = TelemetrySample::new(location, req.speed);
    sample.accuracy = req.accuracy;
    sample.timestamp = req.timestamp;

    // Guard is released before any await
    let outcome = {
        let mut journey = journey.lock();
        if journey.status().is_terminal() {
            None
        } else {
            let checkpoint = journey.checkpoint();
            Some(match journey.ingest(sample) {
                Some(update) => Ok((update, checkpoint)),
                None => Err(journey.last_timestamp()),
            })
        }
    };

    let (update, checkpoint) = match outcome {
        None => {
            return Err(AppError::NotFound(format!("Journey {} is no longer active", req.session_id)));
        }
        Some(Err(last_timestamp)) => {
            return Ok(Json(TelemetryResponse::Dropped(DroppedSample {
                session_id: req.session_id,
                accepted: false,
                last_timestamp,
            })));
        }
        Some(Ok(accepted)) => accepted,
    };

    if let Err(e) = Telemetry::record_scored(&state.pool, &update, req.accuracy).await {
        // Unstored samples must not count, so a retry is scored afresh
        let mut journey = journey.lock();
        if journey.last_timestamp() == Some(update.timestamp) {
            journey.rollback(checkpoint);
        } else {
            tracing::warn!(
                "Journey {} moved past unstored sample {}, keeping it in memory",
                update.session_id,
                update.timestamp
            );
        }
        return Err(e.into());
    }

    if !update.reasons.is_empty() {
        tracing::debug!(
            "Journey {} risk {} ({}): {:?}",
            update.session_id,
            update.risk_score,
            update.severity,
            update.reasons
        );
    }

    state.events.publish(JourneyEvent::RideUpdate(update.clone()));
    Ok(Json(TelemetryResponse::Accepted(update)))
}

/// End a journey, purging it when nothing ever happened
pub async fn end(
    State(state): State<AppState>,
    Json(req): Json<EndRideRequest>,
) -> AppResult<Json<EndRideResponse>> {
    req.validate()?;

    let journey = state
        .registry
        .get(&req.session_id)
        .ok_or_else(|| AppError::NotFound("Journey not found".to_string()))?;

    // A completed journey still registered is one whose closure was not
    // persisted yet
    let closure = {
        let mut journey = journey.lock();
        match journey.end() {
            Some(closure) => Some(closure),
            None => journey.closure().filter(|c| c.status == JourneyStatus::Completed),
        }
    };
    let closure = closure.ok_or_else(|| AppError::NotFound("Journey not found".to_string()))?;

    // Stays registered, and so closed to telemetry, until storage agrees
    housekeeping::persist_closure(&state.pool, &closure).await?;
    state.registry.remove(&closure.session_id);

    state.events.publish(JourneyEvent::closed(&closure));

    Ok(Json(EndRideResponse {
        session_id: closure.session_id,
        status: "ENDED",
        peak_severity: closure.peak_severity,
        purged: closure.purge,
    }))
}

/// Summary of every live journey
pub async fn active(State(state): State<AppState>) -> Json<Vec<JourneySnapshot>> {
    Json(state.registry.snapshots())
}

/// Audit log: live from memory, or from storage once the journey closed
pub async fn history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> AppResult<Json<HistoryResponse>> {
    if let Some(journey) = state.registry.get(&session_id) {
        let events = journey.lock().history();
        return Ok(Json(HistoryResponse {
            session_id,
            live: true,
            events: events.into_iter().map(HistoryEntry::from).collect(),
        }));
    }

    if Journey::find_by_id(&state.pool, &session_id).await?.is_none() {
        return Err(AppError::NotFound("Journey not found".to_string()));
    }

    let entries = RiskLogEntry::list_for(&state.pool, &session_id).await?;
    Ok(Json(HistoryResponse {
        session_id,
        live: false,
        events: entries.into_iter().map(HistoryEntry::from).collect(),
    }))
}
