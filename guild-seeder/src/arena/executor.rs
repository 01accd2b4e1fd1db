//! Quest execution port.

use async_trait::async_trait;

use guild_core::{Agent, PostedQuest, QuestValue};

use crate::error::RoundError;

/// Produces an agent's output for a claimed quest.
///
/// Model-backed executors belong to the embedding application.
#[async_trait]
pub trait QuestExecutor: Send + Sync {
    /// Identifier used in logs.
    fn id(&self) -> &str;

    async fn execute(&self, agent: &Agent, quest: &PostedQuest) -> Result<QuestValue, RoundError>;
}

/// Deterministic executor that echoes the quest input back.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoExecutor;

#[async_trait]
impl QuestExecutor for EchoExecutor {
    fn id(&self) -> &str {
        "echo"
    }

    async fn execute(&self, agent: &Agent, quest: &PostedQuest) -> Result<QuestValue, RoundError> {
        let mut output = QuestValue::map()
            .with_entry("agent", agent.name.as_str())
            .with_entry("quest", quest.draft.title.as_str())
            .with_entry("input", quest.draft.input.clone());
        if let Some(mentor) = &quest.draft.mentor {
            output = output.with_entry("mentor", mentor.as_str());
        }
        Ok(output)
    }
}
