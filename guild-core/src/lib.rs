//! Guild Core - agent progression model and collaborator ports
//!
//! Shared foundation for the Guildhall crates:
//! - Progression rules (level, tier, difficulty, XP curve)
//! - Agents, guilds and skill proficiencies
//! - Structured quest payloads
//! - Ports for the quest board, the agent store and progress reporting
//! - Cancellable execution context
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │        Orchestration (guild-seeder)          │
//! └──────┬──────────────┬──────────────┬─────────┘
//!        │              │              │
//!        ▼              ▼              ▼
//! ┌────────────┐ ┌────────────┐ ┌──────────────┐
//! │   Board    │ │   Store    │ │ ProgressSink │
//! │ (lifecycle,│ │ (agents,   │ │ (fire and    │
//! │  verdicts) │ │  guilds)   │ │  forget)     │
//! └────────────┘ └────────────┘ └──────────────┘
//! ```

pub mod board;
pub mod context;
pub mod memory;
pub mod progress;
pub mod progression;
pub mod store;
pub mod types;
pub mod value;

// Re-export main types for convenience
pub use board::{Board, BoardError, PostedQuest, QuestDraft, QuestReceipt, QuestStatus, Verdict};
pub use context::{ContextError, ExecutionContext};
pub use progress::{
    BroadcastProgress, NoopProgress, ProgressEvent, ProgressPhase, ProgressSink, TracingProgress,
};
pub use progression::{
    clamp_level, is_valid_level, xp_to_next_level, Difficulty, ProficiencyLevel, Tier, MAX_LEVEL,
    MIN_LEVEL,
};
pub use store::{instance_for, Store, StoreConfig, StoreError};
pub use types::*;
pub use value::QuestValue;
