//! The creature ("horse") record derived from a quiz submission.

use serde::{Deserialize, Serialize};

pub const STAT_MIN: i64 = 1;
pub const STAT_MAX: i64 = 10;

/// Stat value used whenever a stat is missing or unusable.
pub const DEFAULT_STAT: u8 = 6;

/// Clamp any integer into the stat range.
pub fn clamp_stat(value: i64) -> u8 {
    value.clamp(STAT_MIN, STAT_MAX) as u8
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creature {
    pub name: String,
    pub temperament: String,
    pub color_scheme: String,
    pub speed: u8,
    pub stamina: u8,
    pub skill: u8,
    pub catchphrase: String,
}

impl Creature {
    /// Returned when generated text cannot be read as a creature.
    pub fn unparsed_fallback() -> Self {
        Self {
            name: "NoName".to_string(),
            temperament: "穏やか".to_string(),
            color_scheme: "青×白".to_string(),
            speed: DEFAULT_STAT,
            stamina: DEFAULT_STAT,
            skill: DEFAULT_STAT,
            catchphrase: "行くぞ！".to_string(),
        }
    }

    /// Returned when the text generator could not be reached at all.
    pub fn unavailable_fallback() -> Self {
        Self {
            name: "Fallback".to_string(),
            temperament: "素直".to_string(),
            color_scheme: "青×白".to_string(),
            speed: DEFAULT_STAT,
            stamina: DEFAULT_STAT,
            skill: DEFAULT_STAT,
            catchphrase: "がんばるぞ！".to_string(),
        }
    }

    pub fn stats(&self) -> [u8; 3] {
        [self.speed, self.stamina, self.skill]
    }
}
