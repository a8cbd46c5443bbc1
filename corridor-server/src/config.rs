//! Configuration module

use std::env;
use std::path::PathBuf;

use chrono::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection URL
    pub database_url: String,

    /// Server port
    pub port: u16,

    /// Journeys silent for longer than this are abandoned
    pub stale_after_minutes: i64,

    /// How often housekeeping looks for stale journeys
    pub sweep_interval_secs: u64,

    /// Optional JSON file with scoring thresholds
    pub scoring_config: Option<PathBuf>,

    /// Environment (development, production)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://safecorridor.db".to_string(),
            port: 3000,
            stale_after_minutes: 120,
            sweep_interval_secs: 300,
            scoring_config: None,
            environment: "development".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or(defaults.database_url),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),

            stale_after_minutes: env::var("STALE_AFTER_MINUTES")
                .ok()
                .and_then(|m| m.parse().ok())
                .filter(|m: &i64| *m > 0)
                .unwrap_or(defaults.stale_after_minutes),

            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|s: &u64| *s > 0)
                .unwrap_or(defaults.sweep_interval_secs),

            scoring_config: env::var("SCORING_CONFIG")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),

            environment: env::var("ENVIRONMENT")
                .unwrap_or(defaults.environment),
        }
    }

    /// Idle window after which a live journey counts as abandoned
    pub fn stale_after(&self) -> Duration {
        Duration::minutes(self.stale_after_minutes)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
