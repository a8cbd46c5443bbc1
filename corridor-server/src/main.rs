//! Safe Corridor Backend Server
//!
//! Receives rider telemetry, scores each journey live and pushes updates to
//! monitoring dashboards.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SAFE CORRIDOR SERVER                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────────┐  ┌─────────────────────┐ │
//! │  │  REST     │  │  Journey      │  │  Housekeeping       │ │
//! │  │  API      │─▶│  Registry     │◀─│  (stale sweep)      │ │
//! │  │  (Axum)   │  │  (core FSMs)  │  │                     │ │
//! │  └─────┬─────┘  └───────────────┘  └──────────┬──────────┘ │
//! │        │  ┌─────────────┐   ┌──────────────┐  │            │
//! │        ├─▶│   SQLite    │   │  Event hub   │◀─┘            │
//! │        │  └─────────────┘   │  (SSE feed)  │               │
//! │        └───────────────────▶└──────────────┘               │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod models;
mod handlers;
mod error;
mod events;
mod registry;
mod housekeeping;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use corridor_core::ScoringThresholds;

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "corridor_server=debug,corridor_core=info,tower_http=debug".into());
    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Safe Corridor Server starting...");
    tracing::info!("Database: {}", config.database_url);

    let thresholds = match &config.scoring_config {
        Some(path) => {
            let thresholds = corridor_core::load_thresholds(path)
                .with_context(|| format!("Failed to load scoring config {}", path.display()))?;
            tracing::info!("Scoring thresholds loaded from {}", path.display());
            thresholds
        }
        None => ScoringThresholds::default(),
    };

    // Initialize database pool
    let pool = db::create_pool(&config.database_url).await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await
        .context("Failed to run migrations")?;

    // Build application state
    let state = AppState::new(pool, config.clone(), thresholds);

    let outcome = housekeeping::rehydrate(&state, chrono::Utc::now()).await
        .context("Failed to rehydrate active journeys")?;
    tracing::info!(
        "Rehydrated {} active journey(s), abandoned {} stale",
        outcome.resumed,
        outcome.abandoned
    );

    housekeeping::spawn(state.clone());

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::SqlitePool,
    pub config: config::Config,
    pub registry: Arc<registry::JourneyRegistry>,
    pub events: events::EventHub,
}

impl AppState {
    pub fn new(pool: sqlx::SqlitePool, config: config::Config, thresholds: ScoringThresholds) -> Self {
        Self {
            pool,
            config,
            registry: Arc::new(registry::JourneyRegistry::new(thresholds)),
            events: events::EventHub::new(),
        }
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let ride_routes = Router::new()
        .route("/api/ride/start", post(handlers::ride::start))
        .route("/api/ride/telemetry", post(handlers::ride::telemetry))
        .route("/api/ride/end", post(handlers::ride::end))
        .route("/api/ride/active", get(handlers::ride::active))
        .route("/api/ride/stream", get(handlers::stream::subscribe))
        .route("/api/ride/:id/history", get(handlers::ride::history));

    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(ride_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
