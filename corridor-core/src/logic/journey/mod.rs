//! Journey Module
//!
//! Per-journey state machine wrapping one RiskScorer.
//!
//! ## Structure
//! - `types`: JourneyIdentity, JourneyStatus, JourneyUpdate, JourneyClosure
//! - `eta`: Expected travel time and overdue check
//! - `machine`: JourneyStateMachine (ordering filter, counters, lifecycle)
//!
//! One instance per journey, one caller at a time. Callers that can race
//! must serialise `ingest`/`end` themselves (e.g. a mutex per journey).

pub mod types;
pub mod eta;
pub mod machine;

pub use types::{
    JourneyClosure,
    JourneyIdentity,
    JourneySnapshot,
    JourneyStatus,
    JourneyUpdate,
};

pub use eta::{expected_travel_secs, is_overdue};

pub use machine::{JourneyCheckpoint, JourneyStateMachine};
