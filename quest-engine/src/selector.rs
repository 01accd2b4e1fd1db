//! Difficulty selection: maps an agent level to a concrete quest template.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use guild_core::{Difficulty, Tier};

use crate::templates::{QuestTemplate, QuestTemplateIndex};

/// Difficulty a tier trains at.
pub fn target_difficulty(tier: Tier) -> Difficulty {
    match tier {
        Tier::Apprentice => Difficulty::Trivial,
        Tier::Journeyman => Difficulty::Moderate,
        Tier::Expert => Difficulty::Hard,
        Tier::Master | Tier::Grandmaster => Difficulty::Epic,
    }
}

/// How a template is picked inside the chosen bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "seed")]
pub enum SelectionMode {
    /// First template in load order
    First,
    /// Uniform pick, reproducible for a given seed
    SeededRandom(u64),
}

impl Default for SelectionMode {
    fn default() -> Self {
        Self::First
    }
}

/// Resolves a level to a template with a bucket-with-fallback search.
pub struct DifficultySelector {
    index: Arc<QuestTemplateIndex>,
    mode: SelectionMode,
    rng: Mutex<StdRng>,
}

impl DifficultySelector {
    pub fn new(index: Arc<QuestTemplateIndex>) -> Self {
        Self::with_mode(index, SelectionMode::First)
    }

    pub fn with_mode(index: Arc<QuestTemplateIndex>, mode: SelectionMode) -> Self {
        let seed = match mode {
            SelectionMode::First => 0,
            SelectionMode::SeededRandom(seed) => seed,
        };
        Self {
            index,
            mode,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn index(&self) -> &QuestTemplateIndex {
        &self.index
    }

    /// Pick a template for an agent at `level`.
    ///
    /// Scans from the tier's target difficulty down to Trivial and picks from
    /// the first non-empty bucket. Falls back to the first template in load
    /// order, and returns `None` only for an empty index.
    pub fn select_for_level(&self, level: u8) -> Option<&QuestTemplate> {
        let target = target_difficulty(Tier::from_level(level));

        for difficulty in target.at_or_below() {
            let bucket = self.index.at_difficulty(difficulty);
            if bucket.is_empty() {
                continue;
            }
            let pick = match self.mode {
                SelectionMode::First => 0,
                SelectionMode::SeededRandom(_) => self.random_index(bucket.len()),
            };
            return Some(bucket[pick]);
        }

        self.index.all().first()
    }

    fn random_index(&self, len: usize) -> usize {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.gen_range(0..len)
    }
}
