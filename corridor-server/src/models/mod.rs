//! Data models

pub mod journey;
pub mod telemetry;
pub mod risk_log;
pub mod ride;

pub use journey::*;
pub use telemetry::*;
pub use risk_log::*;
pub use ride::*;
