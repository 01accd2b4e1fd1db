//! Guild Seeder - bootstraps agent populations
//!
//! Two strategies share one configuration and result shape:
//!
//! - **Training arena**: creates level-1 trainees and levels them through
//!   simulated quests on the board, optionally under NPC mentors
//! - **Tiered roster**: places pre-leveled agents and guilds directly
//!
//! # Architecture
//!
//! ```text
//! SeedConfig ──▶ Seeder ──┬──▶ ArenaOrchestrator ──▶ Board ──▶ Store
//!                         │          │
//!                         │   QuestTemplateIndex, DifficultySelector,
//!                         │   QuestExecutor, Judge
//!                         │
//!                         └──▶ RosterSeeder ──────────────────▶ Store
//!
//!                 both ──▶ ProgressSink, SeedResult | SeedFailure
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use guild_core::memory::{InMemoryBoard, InMemoryStore};
//! use guild_core::ExecutionContext;
//! use guild_seeder::{AgentProfile, ArenaConfig, SeedConfig, Seeder};
//!
//! # async fn example() -> Result<(), guild_seeder::SeedFailure> {
//! let store = Arc::new(InMemoryStore::new());
//! let board = Arc::new(InMemoryBoard::new(store.clone()));
//! let config = SeedConfig::arena(ArenaConfig::new(vec![AgentProfile::new("scout")]));
//!
//! let result = Seeder::new(store, board)
//!     .run(&config, &ExecutionContext::new())
//!     .await?;
//! println!("{} quests completed", result.quests_completed);
//! # Ok(())
//! # }
//! ```

pub mod arena;
pub mod config;
pub mod error;
pub mod result;
pub mod roster;
pub mod seeder;

pub use arena::{trainee_name, ArenaOrchestrator, EchoExecutor, QuestExecutor};
pub use config::{
    AgentProfile, ArenaConfig, GuildSpec, LevelDistribution, RosterAgentSpec, RosterConfig,
    SeedConfig, SeedMode,
};
pub use error::{MentorBootstrapError, Result, RoundError, SeedError, SeedFailure};
pub use result::SeedResult;
pub use roster::RosterSeeder;
pub use seeder::Seeder;
