//! Run summary.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use guild_core::AgentSummary;

use crate::config::SeedMode;

/// What a seeding run did. Non-fatal errors accumulate in `errors` while
/// `success` stays true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedResult {
    pub mode: SeedMode,
    pub success: bool,
    pub dry_run: bool,
    /// Agents created, or that would have been in a dry run
    pub agents_created: u32,
    pub agents_skipped: u32,
    pub guilds_created: u32,
    pub npcs_spawned: u32,
    pub quests_completed: u32,
    /// Round attempts, failed ones included
    pub quests_run: u32,
    pub errors: Vec<String>,
    pub duration: Duration,
    pub agents: Vec<AgentSummary>,
    #[serde(skip)]
    started: Option<Instant>,
}

impl SeedResult {
    pub fn new(mode: SeedMode, dry_run: bool) -> Self {
        Self {
            mode,
            success: true,
            dry_run,
            agents_created: 0,
            agents_skipped: 0,
            guilds_created: 0,
            npcs_spawned: 0,
            quests_completed: 0,
            quests_run: 0,
            errors: Vec::new(),
            duration: Duration::ZERO,
            agents: Vec::new(),
            started: Some(Instant::now()),
        }
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Fold a nested run's counters, errors and agents into this one.
    pub fn absorb(&mut self, other: SeedResult) {
        self.agents_created += other.agents_created;
        self.agents_skipped += other.agents_skipped;
        self.guilds_created += other.guilds_created;
        self.npcs_spawned += other.npcs_spawned;
        self.quests_completed += other.quests_completed;
        self.quests_run += other.quests_run;
        self.errors.extend(other.errors);
        self.agents.extend(other.agents);
    }

    /// Stamp the elapsed time since creation.
    pub fn finish(&mut self) {
        if let Some(started) = self.started {
            self.duration = started.elapsed();
        }
    }
}
