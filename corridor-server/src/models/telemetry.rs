//! Telemetry model

use sqlx::{Sqlite, SqlitePool};
use chrono::{DateTime, Utc};

use corridor_core::JourneyUpdate;

use super::risk_log::RiskLogEntry;

pub struct Telemetry;

impl Telemetry {
    pub async fn record<'e, E>(
        executor: E,
        update: &JourneyUpdate,
        accuracy: Option<f64>,
    ) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let recorded = DateTime::from_timestamp_millis(update.timestamp).unwrap_or_else(Utc::now);

        sqlx::query(
            r#"
            INSERT INTO telemetry (ride_session_id, timestamp, lat, lon, speed, accuracy, risk_score)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(&update.session_id)
        .bind(recorded)
        .bind(update.location.lat)
        .bind(update.location.lon)
        .bind(update.speed)
        .bind(accuracy)
        .bind(update.risk_score)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Store a scored sample and its audit row together, or neither
    pub async fn record_scored(
        pool: &SqlitePool,
        update: &JourneyUpdate,
        accuracy: Option<f64>,
    ) -> Result<(), sqlx::Error> {
        let at = DateTime::from_timestamp_millis(update.timestamp).unwrap_or_else(Utc::now);

        let mut tx = pool.begin().await?;
        Self::record(&mut *tx, update, accuracy).await?;
        RiskLogEntry::record(&mut *tx, &update.session_id, &update.reasons, update.risk_score, at).await?;
        tx.commit().await
    }

    #[cfg(test)]
    pub async fn count_for(pool: &SqlitePool, session_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM telemetry WHERE ride_session_id = ?")
            .bind(session_id)
            .fetch_one(pool)
            .await
    }
}
