//! Journey model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use chrono::{DateTime, Utc};

use corridor_core::{GeoPoint, JourneyIdentity, JourneyStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Journey {
    pub ride_session_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub start_lat: f64,
    pub start_lon: f64,
    pub end_lat: f64,
    pub end_lon: f64,
    pub final_state: String,
}

impl Journey {
    pub fn identity(&self) -> JourneyIdentity {
        JourneyIdentity::new(
            self.ride_session_id.clone(),
            GeoPoint::new(self.start_lat, self.start_lon),
            GeoPoint::new(self.end_lat, self.end_lon),
            self.start_time,
        )
    }

    pub async fn create(pool: &SqlitePool, identity: &JourneyIdentity) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO rides (ride_session_id, start_time, start_lat, start_lon, end_lat, end_lon, final_state)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(&identity.session_id)
        .bind(identity.started_at)
        .bind(identity.start.lat)
        .bind(identity.start.lon)
        .bind(identity.end.lat)
        .bind(identity.end.lon)
        .bind(JourneyStatus::Active.as_str())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Insert unless a row with this id exists. True when this call inserted.
    pub async fn create_if_absent(pool: &SqlitePool, identity: &JourneyIdentity) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO rides (ride_session_id, start_time, start_lat, start_lon, end_lat, end_lon, final_state)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(&identity.session_id)
        .bind(identity.started_at)
        .bind(identity.start.lat)
        .bind(identity.start.lon)
        .bind(identity.end.lat)
        .bind(identity.end.lon)
        .bind(JourneyStatus::Active.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id(pool: &SqlitePool, session_id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Journey>("SELECT * FROM rides WHERE ride_session_id = ?")
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_active(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Journey>(
            "SELECT * FROM rides WHERE final_state = ? ORDER BY start_time ASC"
        )
        .bind(JourneyStatus::Active.as_str())
        .fetch_all(pool)
        .await
    }

    pub async fn update_status(
        pool: &SqlitePool,
        session_id: &str,
        status: JourneyStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE rides SET final_state = ?, end_time = ? WHERE ride_session_id = ?"
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(session_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Hard-delete the journey with all its telemetry and audit rows
    pub async fn purge(pool: &SqlitePool, session_id: &str) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM telemetry WHERE ride_session_id = ?")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM risk_log WHERE ride_session_id = ?")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM rides WHERE ride_session_id = ?")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!("Privacy: hard deleted uneventful journey {}", session_id);
        Ok(())
    }

    /// Time of the latest recorded sample, if any
    pub async fn last_sample_at(&self, pool: &SqlitePool) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
        sqlx::query_scalar("SELECT MAX(timestamp) FROM telemetry WHERE ride_session_id = ?")
            .bind(&self.ride_session_id)
            .fetch_one(pool)
            .await
    }
}
