//! HTTP handlers

pub mod health;
pub mod ride;
pub mod stream;
