//! Domain models for the mint service.

pub mod creature;
pub mod quiz;

pub use creature::{clamp_stat, Creature, DEFAULT_STAT, STAT_MAX, STAT_MIN};
pub use quiz::{Focus, QuizAnswers};
