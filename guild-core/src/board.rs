//! Quest board port.
//!
//! The board owns the quest lifecycle (post, claim, start, submit or abandon).
//! Submission is where a judged verdict is applied to the agent's progression;
//! nothing in the orchestration engine mutates XP or level itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::progression::Difficulty;
use crate::types::AgentId;
use crate::value::QuestValue;

/// Error types for board operations.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// Quest id unknown to the board
    #[error("Quest not found: {0}")]
    QuestNotFound(String),

    /// Agent unknown to the backing store
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// Lifecycle call made from the wrong state
    #[error("Quest {quest_id} is {actual:?}, expected {expected:?}")]
    InvalidTransition {
        quest_id: String,
        expected: QuestStatus,
        actual: QuestStatus,
    },

    /// Backend failure
    #[error("Board backend error: {0}")]
    Backend(String),
}

/// Lifecycle state of a posted quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    Posted,
    Claimed,
    InProgress,
    Completed,
    Failed,
}

/// Everything needed to post a quest instance from a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestDraft {
    pub template_id: String,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub required_skills: BTreeSet<String>,
    pub input: QuestValue,
    /// Base reward after any multiplier
    pub base_xp: u64,
    /// Mentor overseeing the attempt, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mentor: Option<AgentId>,
}

/// A quest instance known to the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostedQuest {
    pub id: String,
    pub draft: QuestDraft,
    pub status: QuestStatus,
    pub claimed_by: Option<AgentId>,
    pub posted_at: DateTime<Utc>,
}

/// Reward or penalty outcome of a judged quest.
///
/// Exactly one of `xp_awarded` and `xp_penalty` is nonzero for a nonzero
/// base reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct Verdict {
    pub passed: bool,
    pub quality_score: f64,
    pub xp_awarded: u64,
    pub xp_penalty: u64,
    pub feedback: String,
}

/// What the board reports back after applying a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestReceipt {
    pub quest_id: String,
    pub agent_id: AgentId,
    pub status: QuestStatus,
    pub xp_delta: i64,
    pub level_before: u8,
    pub level_after: u8,
}

impl QuestReceipt {
    pub fn leveled_up(&self) -> bool {
        self.level_after > self.level_before
    }
}

/// Quest board lifecycle.
#[async_trait]
pub trait Board: Send + Sync {
    /// Publish a quest and return its board record.
    async fn post_quest(&self, draft: QuestDraft) -> Result<PostedQuest, BoardError>;

    /// Assign a posted quest to an agent.
    async fn claim_quest(&self, quest_id: &str, agent_id: &AgentId) -> Result<(), BoardError>;

    /// Move a claimed quest into progress.
    async fn start_quest(&self, quest_id: &str) -> Result<(), BoardError>;

    /// Submit the output together with its verdict. The board applies the
    /// verdict to the claiming agent.
    async fn submit_result(
        &self,
        quest_id: &str,
        output: QuestValue,
        verdict: Verdict,
    ) -> Result<QuestReceipt, BoardError>;

    /// Give up on a claimed quest without a verdict. The quest ends Failed
    /// unless it already finished, and the claimant is released to Idle with
    /// its progression untouched.
    async fn abandon_quest(&self, quest_id: &str) -> Result<(), BoardError>;
}
