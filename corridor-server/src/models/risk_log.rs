//! Risk audit log model

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RiskLogEntry {
    pub id: i64,
    pub ride_session_id: String,
    pub timestamp: DateTime<Utc>,
    /// JSON array of reason strings
    pub reasons: String,
    pub risk_score: f64,
}

impl RiskLogEntry {
    pub fn reason_list(&self) -> Vec<String> {
        serde_json::from_str(&self.reasons).unwrap_or_default()
    }

    /// Append an audit row; no-op when there is nothing to explain
    pub async fn record<'e, E>(
        executor: E,
        session_id: &str,
        reasons: &[String],
        risk_score: f64,
        at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        if reasons.is_empty() {
            return Ok(());
        }

        let reasons_json = serde_json::to_string(reasons)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        sqlx::query(
            "INSERT INTO risk_log (ride_session_id, timestamp, reasons, risk_score) VALUES (?, ?, ?, ?)"
        )
        .bind(session_id)
        .bind(at)
        .bind(reasons_json)
        .bind(risk_score)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn list_for(pool: &SqlitePool, session_id: &str) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, RiskLogEntry>(
            "SELECT * FROM risk_log WHERE ride_session_id = ? ORDER BY timestamp ASC, id ASC"
        )
        .bind(session_id)
        .fetch_all(pool)
        .await
    }
}
