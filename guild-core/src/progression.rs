//! Progression rules: levels, tiers, quest difficulty and the XP curve.
//!
//! Tier is always a pure function of level. Every component that needs a
//! tier derives it through [`Tier::from_level`] rather than storing its own
//! copy of the band table.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Lowest attainable level.
pub const MIN_LEVEL: u8 = 1;

/// Highest attainable level.
pub const MAX_LEVEL: u8 = 20;

/// Coarse rank band derived from level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Levels 1-5
    Apprentice = 1,
    /// Levels 6-10
    Journeyman = 2,
    /// Levels 11-15
    Expert = 3,
    /// Levels 16-18
    Master = 4,
    /// Levels 19-20
    Grandmaster = 5,
}

impl Tier {
    /// Derive the tier for a level. Out-of-range levels are clamped first.
    pub fn from_level(level: u8) -> Self {
        match clamp_level(level) {
            1..=5 => Self::Apprentice,
            6..=10 => Self::Journeyman,
            11..=15 => Self::Expert,
            16..=18 => Self::Master,
            _ => Self::Grandmaster,
        }
    }

    /// Lowest level that belongs to this tier.
    pub fn min_level(&self) -> u8 {
        match self {
            Self::Apprentice => 1,
            Self::Journeyman => 6,
            Self::Expert => 11,
            Self::Master => 16,
            Self::Grandmaster => 19,
        }
    }

    /// Highest level that belongs to this tier.
    pub fn max_level(&self) -> u8 {
        match self {
            Self::Apprentice => 5,
            Self::Journeyman => 10,
            Self::Expert => 15,
            Self::Master => 18,
            Self::Grandmaster => MAX_LEVEL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apprentice => "apprentice",
            Self::Journeyman => "journeyman",
            Self::Expert => "expert",
            Self::Master => "master",
            Self::Grandmaster => "grandmaster",
        }
    }

    /// All tiers, highest first.
    pub fn all_descending() -> Vec<Self> {
        vec![
            Self::Grandmaster,
            Self::Master,
            Self::Expert,
            Self::Journeyman,
            Self::Apprentice,
        ]
    }
}

impl Default for Tier {
    fn default() -> Self {
        Self::Apprentice
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered quest hardness. The ordering is total and drives every fallback
/// search over difficulty buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Trivial = 0,
    Easy = 1,
    Moderate = 2,
    Hard = 3,
    Epic = 4,
}

impl Difficulty {
    /// Base XP reward for a quest of this difficulty, before any multiplier.
    pub fn base_xp(&self) -> u64 {
        match self {
            Self::Trivial => 25,
            Self::Easy => 50,
            Self::Moderate => 100,
            Self::Hard => 200,
            Self::Epic => 400,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trivial => "trivial",
            Self::Easy => "easy",
            Self::Moderate => "moderate",
            Self::Hard => "hard",
            Self::Epic => "epic",
        }
    }

    /// All difficulties, hardest first.
    pub fn all_descending() -> Vec<Self> {
        vec![
            Self::Epic,
            Self::Hard,
            Self::Moderate,
            Self::Easy,
            Self::Trivial,
        ]
    }

    /// This difficulty and every easier one, hardest first.
    pub fn at_or_below(self) -> impl Iterator<Item = Difficulty> {
        Self::all_descending().into_iter().filter(move |d| *d <= self)
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proficiency band for a single skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ProficiencyLevel {
    Novice = 1,
    Apprentice = 2,
    Journeyman = 3,
    Expert = 4,
    Master = 5,
}

impl ProficiencyLevel {
    /// Next band up, or `None` at Master.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Novice => Some(Self::Apprentice),
            Self::Apprentice => Some(Self::Journeyman),
            Self::Journeyman => Some(Self::Expert),
            Self::Expert => Some(Self::Master),
            Self::Master => None,
        }
    }
}

impl Default for ProficiencyLevel {
    fn default() -> Self {
        Self::Novice
    }
}

/// Clamp a level into `MIN_LEVEL..=MAX_LEVEL`.
pub fn clamp_level(level: u8) -> u8 {
    level.clamp(MIN_LEVEL, MAX_LEVEL)
}

/// Whether a level lies in the valid range.
pub fn is_valid_level(level: u8) -> bool {
    (MIN_LEVEL..=MAX_LEVEL).contains(&level)
}

/// XP needed to advance from `level` to the next one. Zero at the cap.
pub fn xp_to_next_level(level: u8) -> u64 {
    let level = clamp_level(level);
    if level >= MAX_LEVEL {
        0
    } else {
        100 * u64::from(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_monotonic_over_levels() {
        let mut previous = Tier::from_level(MIN_LEVEL);
        for level in MIN_LEVEL..=MAX_LEVEL {
            let tier = Tier::from_level(level);
            assert!(tier >= previous, "tier dropped at level {level}");
            assert!(tier.min_level() <= level && level <= tier.max_level());
            previous = tier;
        }
        assert_eq!(Tier::from_level(MAX_LEVEL), Tier::Grandmaster);
    }

    #[test]
    fn test_tier_bands_round_trip() {
        for tier in Tier::all_descending() {
            assert_eq!(Tier::from_level(tier.min_level()), tier);
            assert_eq!(Tier::from_level(tier.max_level()), tier);
        }
    }

    #[test]
    fn test_out_of_range_levels_clamp() {
        assert_eq!(Tier::from_level(0), Tier::Apprentice);
        assert_eq!(Tier::from_level(99), Tier::Grandmaster);
    }

    #[test]
    fn test_difficulty_ordering() {
        assert!(Difficulty::Trivial < Difficulty::Easy);
        assert!(Difficulty::Hard < Difficulty::Epic);

        let below: Vec<_> = Difficulty::Moderate.at_or_below().collect();
        assert_eq!(
            below,
            vec![Difficulty::Moderate, Difficulty::Easy, Difficulty::Trivial]
        );
    }

    #[test]
    fn test_xp_curve() {
        assert_eq!(xp_to_next_level(1), 100);
        assert_eq!(xp_to_next_level(19), 1900);
        assert_eq!(xp_to_next_level(MAX_LEVEL), 0);
    }
}
