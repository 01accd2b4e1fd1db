//! Agents, guilds and their progression snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::progression::{clamp_level, xp_to_next_level, ProficiencyLevel, Tier, MAX_LEVEL};

/// Skill every mentor must hold.
pub const TRAINING_SKILL: &str = "training";

/// Default guild capacity.
pub const DEFAULT_GUILD_CAPACITY: usize = 20;

/// Reputation a freshly founded guild starts with.
pub const BASELINE_REPUTATION: f64 = 0.5;

/// Progress points needed to advance one proficiency band.
pub const PROFICIENCY_PROGRESS_CAP: u32 = 100;

/// Fully qualified agent entity id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Guild identifier, chosen by whoever declares the guild.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuildId(pub String);

impl GuildId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Availability of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Free to claim work
    Idle,
    /// Currently on a quest
    Busy,
    /// Cooling down after a failure
    Resting,
    /// No longer takes work
    Retired,
}

impl Default for AgentStatus {
    fn default() -> Self {
        Self::Idle
    }
}

/// Proficiency in a single skill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillProficiency {
    pub proficiency_level: ProficiencyLevel,
    /// Progress towards the next band, `0..PROFICIENCY_PROGRESS_CAP`
    pub progress: u32,
    pub total_xp: u64,
    pub quests_used: u32,
}

impl SkillProficiency {
    /// Fresh proficiency at the novice band.
    pub fn novice() -> Self {
        Self::default()
    }

    /// Record a quest that exercised this skill.
    pub fn record(&mut self, xp: u64) {
        self.quests_used = self.quests_used.saturating_add(1);
        self.total_xp = self.total_xp.saturating_add(xp);

        // One point of progress per ten XP, at least one per quest used.
        let gained = u32::try_from((xp / 10).max(1)).unwrap_or(u32::MAX);
        self.progress = self.progress.saturating_add(gained);
        while self.progress >= PROFICIENCY_PROGRESS_CAP {
            match self.proficiency_level.next() {
                Some(next) => {
                    self.proficiency_level = next;
                    self.progress -= PROFICIENCY_PROGRESS_CAP;
                }
                None => {
                    self.progress = PROFICIENCY_PROGRESS_CAP;
                    break;
                }
            }
        }
    }
}

/// An agent with its mutable progression snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    /// Unique across the store; the idempotency key for seeding
    pub name: String,
    pub level: u8,
    pub tier: Tier,
    /// XP earned inside the current level
    pub xp: u64,
    pub xp_to_next_level: u64,
    pub status: AgentStatus,
    /// Capabilities the agent can exercise (e.g. `training`)
    pub skills: BTreeSet<String>,
    pub skill_proficiencies: BTreeMap<String, SkillProficiency>,
    pub guilds: BTreeSet<GuildId>,
    pub is_npc: bool,
    /// Opaque model configuration, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_config: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// Create an idle agent at the baseline of `level`.
    pub fn new(id: AgentId, name: impl Into<String>, level: u8) -> Self {
        let level = clamp_level(level);
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            level,
            tier: Tier::from_level(level),
            xp: 0,
            xp_to_next_level: xp_to_next_level(level),
            status: AgentStatus::Idle,
            skills: BTreeSet::new(),
            skill_proficiencies: BTreeMap::new(),
            guilds: BTreeSet::new(),
            is_npc: false,
            llm_config: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the capability set.
    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    /// Start every listed skill at novice proficiency.
    pub fn with_novice_proficiencies(mut self) -> Self {
        for skill in &self.skills {
            self.skill_proficiencies
                .entry(skill.clone())
                .or_insert_with(SkillProficiency::novice);
        }
        self
    }

    /// Mark as a non-player agent.
    pub fn with_npc(mut self, is_npc: bool) -> Self {
        self.is_npc = is_npc;
        self
    }

    /// Attach an opaque model configuration.
    pub fn with_llm_config(mut self, config: Option<serde_json::Value>) -> Self {
        self.llm_config = config;
        self
    }

    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.contains(skill)
    }

    pub fn is_idle(&self) -> bool {
        self.status == AgentStatus::Idle
    }

    /// Add XP, rolling over into as many level ups as it pays for.
    /// Returns the number of levels gained.
    pub fn grant_xp(&mut self, amount: u64) -> u8 {
        let start = self.level;
        self.xp += amount;

        while self.level < MAX_LEVEL && self.xp >= self.xp_to_next_level {
            self.xp -= self.xp_to_next_level;
            self.level += 1;
            self.xp_to_next_level = xp_to_next_level(self.level);
        }
        if self.level >= MAX_LEVEL {
            self.xp = 0;
        }

        self.tier = Tier::from_level(self.level);
        self.updated_at = Utc::now();
        self.level - start
    }

    /// Remove XP inside the current level. Never drops a level.
    pub fn deduct_xp(&mut self, amount: u64) {
        self.xp = self.xp.saturating_sub(amount);
        self.updated_at = Utc::now();
    }

    pub fn summary(&self) -> AgentSummary {
        AgentSummary::from(self)
    }
}

/// Condensed view of an agent for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: AgentId,
    pub name: String,
    pub level: u8,
    pub tier: Tier,
    pub xp: u64,
    pub is_npc: bool,
    pub guilds: Vec<GuildId>,
}

impl From<&Agent> for AgentSummary {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id.clone(),
            name: agent.name.clone(),
            level: agent.level,
            tier: agent.tier,
            xp: agent.xp,
            is_npc: agent.is_npc,
            guilds: agent.guilds.iter().cloned().collect(),
        }
    }
}

/// A guild agents can belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guild {
    pub id: GuildId,
    pub name: String,
    pub description: String,
    pub culture: String,
    pub min_level: u8,
    pub members: Vec<AgentId>,
    pub max_members: usize,
    pub reputation: f64,
    pub created_at: DateTime<Utc>,
}

impl Guild {
    /// Found a guild with no members, default capacity and baseline reputation.
    pub fn found(
        id: GuildId,
        name: impl Into<String>,
        description: impl Into<String>,
        culture: impl Into<String>,
        min_level: u8,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: description.into(),
            culture: culture.into(),
            min_level: clamp_level(min_level),
            members: Vec::new(),
            max_members: DEFAULT_GUILD_CAPACITY,
            reputation: BASELINE_REPUTATION,
            created_at: Utc::now(),
        }
    }

    pub fn has_member(&self, agent_id: &AgentId) -> bool {
        self.members.iter().any(|m| m == agent_id)
    }

    /// Append a member unless already present. Returns whether it was added.
    pub fn add_member(&mut self, agent_id: AgentId) -> bool {
        if self.has_member(&agent_id) {
            return false;
        }
        self.members.push(agent_id);
        true
    }
}
