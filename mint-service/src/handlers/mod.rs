//! HTTP handlers for the mint service.

pub mod debug;
pub mod health;
pub mod metrics;
pub mod mint;
pub mod quiz;
