//! Seeding configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use guild_core::{is_valid_level, GuildId, Tier, MAX_LEVEL, MIN_LEVEL};
use quest_engine::{JudgeProfile, SelectionMode};

use crate::error::{Result, SeedError};

/// Placeholder replaced by the 1-based index in roster name patterns.
pub const NAME_PLACEHOLDER: &str = "{n}";

/// Which bootstrap strategy a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedMode {
    /// Level agents up through simulated quests
    TrainingArena,
    /// Place pre-leveled agents and guilds directly
    TieredRoster,
}

impl SeedMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrainingArena => "training_arena",
            Self::TieredRoster => "tiered_roster",
        }
    }
}

impl std::fmt::Display for SeedMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level configuration for a seeding run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    pub mode: SeedMode,
    /// Record intent without writing anything
    #[serde(default)]
    pub dry_run: bool,
    /// Skip agents whose name already exists
    #[serde(default = "default_idempotent")]
    pub idempotent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arena: Option<ArenaConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roster: Option<RosterConfig>,
}

fn default_idempotent() -> bool {
    true
}

impl SeedConfig {
    /// Training arena run over the given config.
    pub fn arena(arena: ArenaConfig) -> Self {
        Self {
            mode: SeedMode::TrainingArena,
            dry_run: false,
            idempotent: true,
            arena: Some(arena),
            roster: None,
        }
    }

    /// Tiered roster run over the given config.
    pub fn roster(roster: RosterConfig) -> Self {
        Self {
            mode: SeedMode::TieredRoster,
            dry_run: false,
            idempotent: true,
            arena: None,
            roster: Some(roster),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    /// Parse from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| SeedError::Configuration(format!("invalid YAML: {}", e)))
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| SeedError::Configuration(format!("invalid JSON: {}", e)))
    }

    /// Load from disk. `.json` files parse as JSON, everything else as YAML.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            SeedError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Reject configurations that cannot run. Called before any side effect.
    pub fn validate(&self) -> Result<()> {
        match self.mode {
            SeedMode::TrainingArena => self
                .arena
                .as_ref()
                .ok_or_else(|| invalid("training_arena mode requires an arena section"))?
                .validate(),
            SeedMode::TieredRoster => self
                .roster
                .as_ref()
                .ok_or_else(|| invalid("tiered_roster mode requires a roster section"))?
                .validate(),
        }
    }
}

fn invalid(message: impl Into<String>) -> SeedError {
    SeedError::Configuration(message.into())
}

// ============================================================================
// Training arena
// ============================================================================

/// One trainee to create and level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_config: Option<serde_json::Value>,
}

impl AgentProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            skills: Vec::new(),
            llm_config: None,
        }
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }
}

/// Target levels for trainees.
///
/// Without tier counts every trainee aims for `min_level`. With tier counts
/// the first trainees (in profile order) aim for each tier's floor, highest
/// tier first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelDistribution {
    pub min_level: u8,
    pub max_level: Option<u8>,
    pub tier_counts: BTreeMap<Tier, u32>,
}

impl Default for LevelDistribution {
    fn default() -> Self {
        Self {
            min_level: 5,
            max_level: None,
            tier_counts: BTreeMap::new(),
        }
    }
}

impl LevelDistribution {
    /// Uniform target.
    pub fn uniform(level: u8) -> Self {
        Self {
            min_level: level,
            ..Default::default()
        }
    }

    pub fn with_tier_count(mut self, tier: Tier, count: u32) -> Self {
        self.tier_counts.insert(tier, count);
        self
    }

    pub fn with_max_level(mut self, level: u8) -> Self {
        self.max_level = Some(level);
        self
    }

    /// Level at which training counts as converged: `min_level`, capped at
    /// `max_level`.
    pub fn convergence_level(&self) -> u8 {
        self.min_level.min(self.max_level.unwrap_or(MAX_LEVEL))
    }

    /// Advisory tier goal for each of `agents` trainees, in profile order.
    /// Training stops at [`convergence_level`](Self::convergence_level)
    /// regardless of these.
    pub fn tier_goals(&self, agents: usize) -> Vec<u8> {
        let cap = self.max_level.unwrap_or(MAX_LEVEL);
        let mut targets = Vec::with_capacity(agents);

        for tier in Tier::all_descending() {
            let count = self.tier_counts.get(&tier).copied().unwrap_or(0);
            for _ in 0..count {
                if targets.len() == agents {
                    break;
                }
                targets.push(tier.min_level().max(self.min_level).min(cap));
            }
        }

        targets.resize(agents, self.min_level.min(cap));
        targets
    }

    fn validate(&self, agents: usize) -> Result<()> {
        if !is_valid_level(self.min_level) {
            return Err(invalid(format!(
                "min_level {} outside {}..={}",
                self.min_level, MIN_LEVEL, MAX_LEVEL
            )));
        }
        if let Some(max) = self.max_level {
            if !is_valid_level(max) {
                return Err(invalid(format!(
                    "max_level {} outside {}..={}",
                    max, MIN_LEVEL, MAX_LEVEL
                )));
            }
            if self.min_level > max {
                return Err(invalid(format!(
                    "min_level {} exceeds max_level {}",
                    self.min_level, max
                )));
            }
        }

        let assigned: u64 = self.tier_counts.values().map(|&c| u64::from(c)).sum();
        if assigned > agents as u64 {
            return Err(invalid(format!(
                "tier counts assign {} agents but only {} are configured",
                assigned, agents
            )));
        }
        Ok(())
    }
}

/// Configuration for a training arena run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub agents: Vec<AgentProfile>,
    pub target_levels: LevelDistribution,
    /// Quest budget per agent
    pub max_training_quests: u32,
    /// Scales base XP before reward conversion
    pub xp_multiplier: f64,
    /// Bundled template domain, ignored when `quest_file` is set
    pub quest_domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quest_file: Option<PathBuf>,
    pub judge_profile: JudgeProfile,
    /// NPC mentors to spawn when none qualify
    pub bootstrap_mentors: u32,
    pub mentored_training: bool,
    pub trainees_per_mentor: u32,
    pub selection: SelectionMode,
    /// Agents trained concurrently within one round
    pub round_concurrency: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            agents: Vec::new(),
            target_levels: LevelDistribution::default(),
            max_training_quests: 50,
            xp_multiplier: 1.0,
            quest_domain: "general".to_string(),
            quest_file: None,
            judge_profile: JudgeProfile::default(),
            bootstrap_mentors: 0,
            mentored_training: false,
            trainees_per_mentor: 3,
            selection: SelectionMode::default(),
            round_concurrency: 1,
        }
    }
}

impl ArenaConfig {
    pub fn new(agents: Vec<AgentProfile>) -> Self {
        Self {
            agents,
            ..Default::default()
        }
    }

    pub fn with_target_levels(mut self, target_levels: LevelDistribution) -> Self {
        self.target_levels = target_levels;
        self
    }

    pub fn with_max_training_quests(mut self, max: u32) -> Self {
        self.max_training_quests = max;
        self
    }

    pub fn with_quest_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.quest_file = Some(path.into());
        self
    }

    pub fn with_mentors(mut self, bootstrap_mentors: u32) -> Self {
        self.mentored_training = true;
        self.bootstrap_mentors = bootstrap_mentors;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.agents.is_empty() {
            return Err(invalid("arena requires at least one agent profile"));
        }
        if let Some(profile) = self.agents.iter().find(|p| p.name.trim().is_empty()) {
            return Err(invalid(format!(
                "agent profile with skills {:?} has an empty name",
                profile.skills
            )));
        }
        if self.max_training_quests == 0 {
            return Err(invalid("max_training_quests must be positive"));
        }
        if !self.xp_multiplier.is_finite() || self.xp_multiplier <= 0.0 {
            return Err(invalid(format!(
                "xp_multiplier must be positive, got {}",
                self.xp_multiplier
            )));
        }
        if self.mentored_training && self.trainees_per_mentor == 0 {
            return Err(invalid("trainees_per_mentor must be positive"));
        }
        if self.round_concurrency == 0 {
            return Err(invalid("round_concurrency must be positive"));
        }
        self.target_levels.validate(self.agents.len())
    }
}

// ============================================================================
// Tiered roster
// ============================================================================

/// A batch of agents sharing a name pattern and starting level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterAgentSpec {
    /// Contains `{n}` exactly once
    pub name_pattern: String,
    pub count: u32,
    pub level: u8,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_config: Option<serde_json::Value>,
    #[serde(default)]
    pub is_npc: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<GuildId>,
    /// Value `{n}` takes for the first agent
    #[serde(default = "default_first_ordinal")]
    pub first_ordinal: u32,
}

fn default_first_ordinal() -> u32 {
    1
}

impl RosterAgentSpec {
    pub fn new(name_pattern: impl Into<String>, count: u32, level: u8) -> Self {
        Self {
            name_pattern: name_pattern.into(),
            count,
            level,
            skills: Vec::new(),
            llm_config: None,
            is_npc: false,
            guild_id: None,
            first_ordinal: default_first_ordinal(),
        }
    }

    /// Number agents from `ordinal` instead of 1.
    pub fn starting_at(mut self, ordinal: u32) -> Self {
        self.first_ordinal = ordinal;
        self
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_npc(mut self, is_npc: bool) -> Self {
        self.is_npc = is_npc;
        self
    }

    pub fn with_guild(mut self, guild_id: GuildId) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    /// Concrete names, `{n}` replaced by `count` ordinals from `first_ordinal`.
    pub fn expand_names(&self) -> Vec<String> {
        (0..self.count)
            .map(|i| self.first_ordinal.saturating_add(i))
            .map(|n| self.name_pattern.replace(NAME_PLACEHOLDER, &n.to_string()))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.name_pattern.trim().is_empty() {
            return Err(invalid("roster agent name_pattern is empty"));
        }
        if self.name_pattern.matches(NAME_PLACEHOLDER).count() != 1 {
            return Err(invalid(format!(
                "name_pattern {:?} must contain {} exactly once",
                self.name_pattern, NAME_PLACEHOLDER
            )));
        }
        if self.count == 0 {
            return Err(invalid(format!(
                "name_pattern {:?} has a zero count",
                self.name_pattern
            )));
        }
        if !is_valid_level(self.level) {
            return Err(invalid(format!(
                "name_pattern {:?} has level {} outside {}..={}",
                self.name_pattern, self.level, MIN_LEVEL, MAX_LEVEL
            )));
        }
        Ok(())
    }
}

/// A guild to found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildSpec {
    pub id: GuildId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub culture: String,
    #[serde(default = "default_guild_min_level")]
    pub min_level: u8,
}

fn default_guild_min_level() -> u8 {
    MIN_LEVEL
}

impl GuildSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: GuildId::new(id),
            name: name.into(),
            description: String::new(),
            culture: String::new(),
            min_level: MIN_LEVEL,
        }
    }
}

/// Configuration for a tiered roster run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub agents: Vec<RosterAgentSpec>,
    #[serde(default)]
    pub guilds: Vec<GuildSpec>,
}

impl RosterConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            agents: Vec::new(),
            guilds: Vec::new(),
        }
    }

    pub fn with_agents(mut self, spec: RosterAgentSpec) -> Self {
        self.agents.push(spec);
        self
    }

    pub fn with_guild(mut self, guild: GuildSpec) -> Self {
        self.guilds.push(guild);
        self
    }

    /// Number of agents the roster expands to.
    pub fn agent_count(&self) -> u32 {
        self.agents
            .iter()
            .fold(0u32, |total, spec| total.saturating_add(spec.count))
    }

    pub fn validate(&self) -> Result<()> {
        if self.agents.is_empty() && self.guilds.is_empty() {
            return Err(invalid(format!(
                "roster {:?} declares no agents or guilds",
                self.name
            )));
        }
        for spec in &self.agents {
            spec.validate()?;
        }
        for guild in &self.guilds {
            if guild.id.as_str().trim().is_empty() {
                return Err(invalid(format!("guild {:?} has an empty id", guild.name)));
            }
            if !is_valid_level(guild.min_level) {
                return Err(invalid(format!(
                    "guild {} has min_level {} outside {}..={}",
                    guild.id, guild.min_level, MIN_LEVEL, MAX_LEVEL
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_pattern_expansion() {
        let spec = RosterAgentSpec::new("apprentice-{n}", 3, 2);
        assert_eq!(
            spec.expand_names(),
            vec!["apprentice-1", "apprentice-2", "apprentice-3"]
        );
        assert_eq!(
            RosterAgentSpec::new("mentor-{n}", 2, 8).starting_at(4).expand_names(),
            vec!["mentor-4", "mentor-5"]
        );
    }

    #[test]
    fn test_agent_count_saturates() {
        let roster = RosterConfig::new("huge")
            .with_agents(RosterAgentSpec::new("a-{n}", u32::MAX, 1))
            .with_agents(RosterAgentSpec::new("b-{n}", 2, 1));
        assert_eq!(roster.agent_count(), u32::MAX);
    }

    #[test]
    fn test_roster_validation() {
        let ok = RosterConfig::new("r").with_agents(RosterAgentSpec::new("a-{n}", 2, 3));
        assert!(ok.validate().is_ok());

        for spec in [
            RosterAgentSpec::new("", 1, 1),
            RosterAgentSpec::new("plain", 1, 1),
            RosterAgentSpec::new("{n}-{n}", 1, 1),
            RosterAgentSpec::new("a-{n}", 0, 1),
            RosterAgentSpec::new("a-{n}", 1, 0),
            RosterAgentSpec::new("a-{n}", 1, 21),
        ] {
            let config = RosterConfig::new("r").with_agents(spec);
            assert!(matches!(config.validate(), Err(SeedError::Configuration(_))));
        }

        assert!(RosterConfig::new("empty").validate().is_err());
    }

    #[test]
    fn test_arena_validation() {
        let profiles = vec![AgentProfile::new("scout")];
        assert!(ArenaConfig::new(profiles.clone()).validate().is_ok());
        assert!(ArenaConfig::new(vec![]).validate().is_err());
        assert!(ArenaConfig::new(vec![AgentProfile::new(" ")]).validate().is_err());
        assert!(ArenaConfig::new(profiles.clone())
            .with_max_training_quests(0)
            .validate()
            .is_err());

        let mut config = ArenaConfig::new(profiles.clone());
        config.xp_multiplier = 0.0;
        assert!(config.validate().is_err());

        let config = ArenaConfig::new(profiles.clone())
            .with_target_levels(LevelDistribution::uniform(8).with_max_level(6));
        assert!(config.validate().is_err());

        let config = ArenaConfig::new(profiles)
            .with_target_levels(LevelDistribution::uniform(3).with_tier_count(Tier::Expert, 2));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_section_for_mode() {
        let config = SeedConfig {
            mode: SeedMode::TieredRoster,
            dry_run: false,
            idempotent: true,
            arena: Some(ArenaConfig::new(vec![AgentProfile::new("a")])),
            roster: None,
        };
        assert!(matches!(config.validate(), Err(SeedError::Configuration(_))));
    }

    #[test]
    fn test_tier_goals_and_convergence() {
        assert_eq!(LevelDistribution::uniform(4).tier_goals(3), vec![4, 4, 4]);

        let distribution = LevelDistribution::uniform(3)
            .with_tier_count(Tier::Journeyman, 1)
            .with_tier_count(Tier::Expert, 1);
        assert_eq!(distribution.tier_goals(4), vec![11, 6, 3, 3]);

        let capped = distribution.clone().with_max_level(8);
        assert_eq!(capped.tier_goals(3), vec![8, 6, 3]);

        let floor = LevelDistribution::uniform(7).with_tier_count(Tier::Journeyman, 1);
        assert_eq!(floor.tier_goals(1), vec![7]);

        assert_eq!(distribution.convergence_level(), 3);
        assert_eq!(LevelDistribution::uniform(9).with_max_level(6).convergence_level(), 6);
    }

    #[test]
    fn test_from_yaml_defaults() {
        let yaml = r#"
mode: training_arena
arena:
  agents:
    - name: Scout
      skills: [analysis]
  target_levels:
    min_level: 3
    tier_counts:
      journeyman: 1
  judge_profile: strict
  selection:
    mode: seeded_random
    seed: 7
"#;
        let config = SeedConfig::from_yaml(yaml).unwrap();
        assert!(config.idempotent);
        assert!(!config.dry_run);

        let arena = config.arena.as_ref().unwrap();
        assert_eq!(arena.max_training_quests, 50);
        assert_eq!(arena.xp_multiplier, 1.0);
        assert_eq!(arena.quest_domain, "general");
        assert_eq!(arena.judge_profile, JudgeProfile::Strict);
        assert_eq!(arena.selection, SelectionMode::SeededRandom(7));
        assert_eq!(arena.target_levels.tier_counts[&Tier::Journeyman], 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_roster() {
        let json = r#"{
            "mode": "tiered_roster",
            "dry_run": true,
            "roster": {
                "name": "starter",
                "agents": [{"name_pattern": "scribe-{n}", "count": 2, "level": 7, "guild_id": "scribes"}],
                "guilds": [{"id": "scribes", "name": "Scribes"}]
            }
        }"#;
        let config = SeedConfig::from_json(json).unwrap();
        assert!(config.dry_run);
        let roster = config.roster.as_ref().unwrap();
        assert_eq!(roster.agent_count(), 2);
        assert_eq!(roster.guilds[0].min_level, MIN_LEVEL);
        assert_eq!(roster.agents[0].guild_id, Some(GuildId::new("scribes")));
    }

    #[test]
    fn test_malformed_input_is_configuration_error() {
        assert!(matches!(
            SeedConfig::from_yaml("mode: [unclosed"),
            Err(SeedError::Configuration(_))
        ));
        assert!(matches!(
            SeedConfig::from_json("{\"mode\": \"sideways\"}"),
            Err(SeedError::Configuration(_))
        ));
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = SeedConfig::roster(
            RosterConfig::new("r").with_agents(RosterAgentSpec::new("a-{n}", 1, 1)),
        );
        let yaml = config.to_yaml().unwrap();
        let parsed = SeedConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.roster, config.roster);
        assert_eq!(parsed.mode, SeedMode::TieredRoster);
    }
}
