//! Logic Module - Scoring engine
//!
//! - `corridor/` - Great-circle geometry (cross-track deviation)
//! - `risk/` - Cumulative risk scoring, thresholds, severity
//! - `journey/` - Journey lifecycle around one scorer

pub mod corridor;
pub mod risk;
pub mod journey;
