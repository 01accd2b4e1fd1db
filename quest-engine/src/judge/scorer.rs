//! Pluggable per-criterion scorers.

use async_trait::async_trait;
use std::collections::HashMap;

use guild_core::QuestValue;

use crate::judge::rubric::JudgeCriterion;
use crate::judge::JudgeError;
use crate::templates::QuestTemplate;

/// Scores a quest output against a single criterion.
///
/// Implementations backed by a live model belong to the embedding
/// application; scores outside `[0, 1]` are clamped by the judge.
#[async_trait]
pub trait CriterionScorer: Send + Sync {
    /// Identifier used in logs and feedback.
    fn id(&self) -> &str;

    async fn score(
        &self,
        quest: &QuestTemplate,
        output: &QuestValue,
        criterion: &JudgeCriterion,
    ) -> Result<f64, JudgeError>;
}

/// Scores every criterion the same.
#[derive(Debug, Clone)]
pub struct FixedScorer {
    score: f64,
}

impl FixedScorer {
    pub fn new(score: f64) -> Self {
        Self { score }
    }
}

impl Default for FixedScorer {
    fn default() -> Self {
        Self::new(0.8)
    }
}

#[async_trait]
impl CriterionScorer for FixedScorer {
    fn id(&self) -> &str {
        "fixed"
    }

    async fn score(
        &self,
        _quest: &QuestTemplate,
        _output: &QuestValue,
        _criterion: &JudgeCriterion,
    ) -> Result<f64, JudgeError> {
        Ok(self.score)
    }
}

/// Scores looked up by criterion name, with a fallback for unknown names.
#[derive(Debug, Clone, Default)]
pub struct ScriptedScorer {
    scores: HashMap<String, f64>,
    fallback: Option<f64>,
}

impl ScriptedScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_score(mut self, criterion: impl Into<String>, score: f64) -> Self {
        self.scores.insert(criterion.into(), score);
        self
    }

    /// Score for criteria without a scripted entry. Without a fallback,
    /// unknown criteria are a scorer failure.
    pub fn with_fallback(mut self, score: f64) -> Self {
        self.fallback = Some(score);
        self
    }
}

#[async_trait]
impl CriterionScorer for ScriptedScorer {
    fn id(&self) -> &str {
        "scripted"
    }

    async fn score(
        &self,
        _quest: &QuestTemplate,
        _output: &QuestValue,
        criterion: &JudgeCriterion,
    ) -> Result<f64, JudgeError> {
        self.scores
            .get(&criterion.name)
            .copied()
            .or(self.fallback)
            .ok_or_else(|| JudgeError::ScorerFailed {
                criterion: criterion.name.clone(),
                reason: "no scripted score".to_string(),
            })
    }
}
