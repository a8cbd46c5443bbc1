//! Database module - SQLite connection and migrations

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool_options = if database_url.contains(":memory:") {
        // An in-memory database lives and dies with its single connection
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    pool_options.connect_with(options).await
}

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA_SQL.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Journeys
CREATE TABLE IF NOT EXISTS rides (
    ride_session_id TEXT PRIMARY KEY,
    start_time TEXT NOT NULL,
    end_time TEXT,
    start_lat REAL NOT NULL,
    start_lon REAL NOT NULL,
    end_lat REAL NOT NULL,
    end_lon REAL NOT NULL,
    final_state TEXT NOT NULL DEFAULT 'ACTIVE'
);

-- Accepted samples with the score they produced
CREATE TABLE IF NOT EXISTS telemetry (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ride_session_id TEXT NOT NULL REFERENCES rides(ride_session_id) ON DELETE CASCADE,
    timestamp TEXT NOT NULL,
    lat REAL NOT NULL,
    lon REAL NOT NULL,
    speed REAL NOT NULL,
    accuracy REAL,
    risk_score REAL NOT NULL
);

-- Audit trail of samples that produced reasons
CREATE TABLE IF NOT EXISTS risk_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ride_session_id TEXT NOT NULL REFERENCES rides(ride_session_id) ON DELETE CASCADE,
    timestamp TEXT NOT NULL,
    reasons TEXT NOT NULL,
    risk_score REAL NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_rides_state ON rides(final_state);
CREATE INDEX IF NOT EXISTS idx_telemetry_ride ON telemetry(ride_session_id, timestamp);
CREATE INDEX IF NOT EXISTS idx_risk_log_ride ON risk_log(ride_session_id)
"#;

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn test_migrations_create_tables() {
        let pool = test_pool().await;
        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();
        let names: Vec<String> = rows.iter().map(|r| r.get::<String, _>("name")).collect();
        assert!(names.contains(&"rides".to_string()));
        assert!(names.contains(&"telemetry".to_string()));
        assert!(names.contains(&"risk_log".to_string()));
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = test_pool().await;
        run_migrations(&pool).await.unwrap();
    }
}
