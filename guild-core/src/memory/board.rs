//! In-memory quest board for tests and local runs.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::board::{Board, BoardError, PostedQuest, QuestDraft, QuestReceipt, QuestStatus, Verdict};
use crate::store::{instance_for, Store, StoreError};
use crate::types::{Agent, AgentId, AgentStatus};
use crate::value::QuestValue;

/// Lifecycle operation, used to inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardOperation {
    Post,
    Claim,
    Start,
    Submit,
}

/// Quest board backed by a [`Store`].
///
/// Submitting a verdict applies it to the claiming agent: awarded XP rolls
/// into level ups, penalties drain XP within the level, and every required
/// skill records the quest.
pub struct InMemoryBoard {
    store: Arc<dyn Store>,
    quests: DashMap<String, PostedQuest>,
    outputs: DashMap<String, QuestValue>,
    failing_ops: RwLock<HashSet<BoardOperation>>,
    failing_agents: RwLock<HashSet<AgentId>>,
    submissions: AtomicU32,
}

impl InMemoryBoard {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            quests: DashMap::new(),
            outputs: DashMap::new(),
            failing_ops: RwLock::new(HashSet::new()),
            failing_agents: RwLock::new(HashSet::new()),
            submissions: AtomicU32::new(0),
        }
    }

    /// Make every call of `op` fail until cleared.
    pub async fn fail_operation(&self, op: BoardOperation) {
        self.failing_ops.write().await.insert(op);
    }

    pub async fn clear_failures(&self) {
        self.failing_ops.write().await.clear();
        self.failing_agents.write().await.clear();
    }

    /// Reject every claim made by `agent_id`.
    pub async fn fail_claims_for(&self, agent_id: AgentId) {
        self.failing_agents.write().await.insert(agent_id);
    }

    /// Number of verdicts applied so far.
    pub fn submission_count(&self) -> u32 {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn quest(&self, quest_id: &str) -> Option<PostedQuest> {
        self.quests.get(quest_id).map(|q| q.value().clone())
    }

    pub fn output(&self, quest_id: &str) -> Option<QuestValue> {
        self.outputs.get(quest_id).map(|o| o.value().clone())
    }

    async fn check(&self, op: BoardOperation) -> Result<(), BoardError> {
        if self.failing_ops.read().await.contains(&op) {
            return Err(BoardError::Backend(format!("{op:?} disabled")));
        }
        Ok(())
    }

    fn transition(
        &self,
        quest_id: &str,
        expected: QuestStatus,
        next: QuestStatus,
    ) -> Result<PostedQuest, BoardError> {
        let mut quest = self
            .quests
            .get_mut(quest_id)
            .ok_or_else(|| BoardError::QuestNotFound(quest_id.to_string()))?;
        if quest.status != expected {
            return Err(BoardError::InvalidTransition {
                quest_id: quest_id.to_string(),
                expected,
                actual: quest.status,
            });
        }
        quest.status = next;
        Ok(quest.clone())
    }

    async fn load_agent(&self, agent_id: &AgentId) -> Result<Agent, BoardError> {
        self.store.get_agent_by_id(agent_id).await.map_err(|e| match e {
            StoreError::NotFound(_) => BoardError::AgentNotFound(agent_id.to_string()),
            other => BoardError::Backend(other.to_string()),
        })
    }

    async fn save_agent(&self, agent: Agent) -> Result<(), BoardError> {
        let instance = instance_for(&agent.name);
        self.store
            .put_agent(&instance, agent)
            .await
            .map_err(|e| BoardError::Backend(e.to_string()))
    }
}

#[async_trait]
impl Board for InMemoryBoard {
    async fn post_quest(&self, draft: QuestDraft) -> Result<PostedQuest, BoardError> {
        self.check(BoardOperation::Post).await?;

        let quest = PostedQuest {
            id: uuid::Uuid::new_v4().to_string(),
            draft,
            status: QuestStatus::Posted,
            claimed_by: None,
            posted_at: Utc::now(),
        };
        self.quests.insert(quest.id.clone(), quest.clone());
        Ok(quest)
    }

    async fn claim_quest(&self, quest_id: &str, agent_id: &AgentId) -> Result<(), BoardError> {
        self.check(BoardOperation::Claim).await?;
        if self.failing_agents.read().await.contains(agent_id) {
            return Err(BoardError::Backend(format!("claims disabled for {agent_id}")));
        }

        let mut agent = self.load_agent(agent_id).await?;
        self.transition(quest_id, QuestStatus::Posted, QuestStatus::Claimed)?;
        if let Some(mut quest) = self.quests.get_mut(quest_id) {
            quest.claimed_by = Some(agent_id.clone());
        }

        agent.status = AgentStatus::Busy;
        self.save_agent(agent).await
    }

    async fn start_quest(&self, quest_id: &str) -> Result<(), BoardError> {
        self.check(BoardOperation::Start).await?;
        self.transition(quest_id, QuestStatus::Claimed, QuestStatus::InProgress)?;
        Ok(())
    }

    async fn submit_result(
        &self,
        quest_id: &str,
        output: QuestValue,
        verdict: Verdict,
    ) -> Result<QuestReceipt, BoardError> {
        self.check(BoardOperation::Submit).await?;

        let final_status = if verdict.passed {
            QuestStatus::Completed
        } else {
            QuestStatus::Failed
        };
        let quest = self.transition(quest_id, QuestStatus::InProgress, final_status)?;
        let agent_id = quest
            .claimed_by
            .clone()
            .ok_or_else(|| BoardError::Backend(format!("quest {quest_id} has no claimant")))?;

        let mut agent = self.load_agent(&agent_id).await?;
        let level_before = agent.level;

        let xp_delta = if verdict.passed {
            agent.grant_xp(verdict.xp_awarded);
            for skill in &quest.draft.required_skills {
                agent
                    .skill_proficiencies
                    .entry(skill.clone())
                    .or_default()
                    .record(verdict.xp_awarded);
            }
            verdict.xp_awarded as i64
        } else {
            agent.deduct_xp(verdict.xp_penalty);
            -(verdict.xp_penalty as i64)
        };
        agent.status = AgentStatus::Idle;
        let level_after = agent.level;

        debug!(
            quest_id = %quest_id,
            agent = %agent.name,
            passed = verdict.passed,
            xp_delta = xp_delta,
            level = level_after,
            "Verdict applied"
        );

        self.save_agent(agent).await?;
        self.outputs.insert(quest_id.to_string(), output);
        self.submissions.fetch_add(1, Ordering::SeqCst);

        Ok(QuestReceipt {
            quest_id: quest_id.to_string(),
            agent_id,
            status: final_status,
            xp_delta,
            level_before,
            level_after,
        })
    }

    async fn abandon_quest(&self, quest_id: &str) -> Result<(), BoardError> {
        let claimant = {
            let mut quest = self
                .quests
                .get_mut(quest_id)
                .ok_or_else(|| BoardError::QuestNotFound(quest_id.to_string()))?;
            if matches!(quest.status, QuestStatus::Claimed | QuestStatus::InProgress) {
                quest.status = QuestStatus::Failed;
            }
            quest.claimed_by.clone()
        };

        let Some(agent_id) = claimant else {
            return Ok(());
        };
        let mut agent = self.load_agent(&agent_id).await?;
        if agent.status != AgentStatus::Busy {
            return Ok(());
        }

        debug!(quest_id = %quest_id, agent = %agent.name, "Quest abandoned");
        agent.status = AgentStatus::Idle;
        self.save_agent(agent).await
    }
}
