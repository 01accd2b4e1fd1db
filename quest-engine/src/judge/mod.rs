//! Judge: scores quest outputs and converts results into verdicts.
//!
//! Reward policy lives in [`to_verdict`] and nowhere else. Base XP comes
//! from the quest's difficulty (and any multiplier) upstream.

pub mod rubric;
pub mod scorer;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, Span};

use guild_core::{QuestValue, Verdict};

use crate::templates::QuestTemplate;
pub use rubric::{JudgeCriterion, JudgeProfile, Rubric};
pub use scorer::{CriterionScorer, FixedScorer, ScriptedScorer};

/// Quality the baseline stub reports.
pub const STUB_QUALITY: f64 = 0.8;

/// Error types for judging.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JudgeError {
    #[error("Rubric has no criteria")]
    EmptyRubric,

    #[error("Criterion {criterion} has invalid weight {weight}")]
    InvalidWeight { criterion: String, weight: f64 },

    #[error("Criterion {criterion} has threshold {threshold} outside [0, 1]")]
    InvalidThreshold { criterion: String, threshold: f64 },

    /// Total rubric weight is zero
    #[error("Rubric total weight must be nonzero")]
    DivideByZeroGuard,

    #[error("Scorer failed on {criterion}: {reason}")]
    ScorerFailed { criterion: String, reason: String },
}

/// Outcome of scoring one quest output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeResult {
    pub passed: bool,
    /// Weighted mean score in `[0, 1]`
    pub quality_score: f64,
    pub per_criterion_score: BTreeMap<String, f64>,
    pub per_criterion_passed: BTreeMap<String, bool>,
    pub feedback: String,
}

/// Convert a judge result into a reward or penalty.
///
/// Passed: `floor(base_xp * quality)` awarded. Failed: `floor(base_xp / 4)`
/// deducted. A nonzero base never yields an all-zero verdict; a floor of 0
/// is raised to 1.
pub fn to_verdict(result: &JudgeResult, base_xp: u64) -> Verdict {
    let minimum = u64::from(base_xp > 0);

    let (xp_awarded, xp_penalty) = if result.passed {
        // Epsilon keeps 100 * 0.8 from flooring to 79.
        let raw = (base_xp as f64 * result.quality_score.clamp(0.0, 1.0) + 1e-9).floor() as u64;
        (raw.max(minimum), 0)
    } else {
        (0, (base_xp / 4).max(minimum))
    };

    Verdict {
        passed: result.passed,
        quality_score: result.quality_score,
        xp_awarded,
        xp_penalty,
        feedback: result.feedback.clone(),
    }
}

/// Scores quest outputs with a pluggable [`CriterionScorer`].
pub struct Judge {
    scorer: Arc<dyn CriterionScorer>,
    span: Span,
}

impl Judge {
    pub fn new(scorer: Arc<dyn CriterionScorer>) -> Self {
        Self {
            scorer,
            span: Span::none(),
        }
    }

    /// Log under the given span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Baseline evaluation used when no rubric applies: a deterministic pass
    /// at [`STUB_QUALITY`].
    pub fn evaluate(&self, template: &QuestTemplate, _output: &QuestValue) -> JudgeResult {
        let per_criterion_score = template
            .criteria
            .iter()
            .map(|name| (name.clone(), STUB_QUALITY))
            .collect();
        let per_criterion_passed = template
            .criteria
            .iter()
            .map(|name| (name.clone(), true))
            .collect();

        JudgeResult {
            passed: true,
            quality_score: STUB_QUALITY,
            per_criterion_score,
            per_criterion_passed,
            feedback: format!("{}: accepted by baseline evaluation", template.title),
        }
    }

    /// Score every rubric criterion. Passes only if every criterion meets its
    /// threshold, regardless of the weighted mean.
    pub async fn evaluate_with_rubric(
        &self,
        quest: &QuestTemplate,
        output: &QuestValue,
        rubric: &Rubric,
    ) -> Result<JudgeResult, JudgeError> {
        let mut per_criterion_score = BTreeMap::new();
        let mut per_criterion_passed = BTreeMap::new();
        let mut total_score = 0.0;
        let mut failed = Vec::new();

        for criterion in rubric.criteria() {
            let score = self
                .scorer
                .score(quest, output, criterion)
                .await?
                .clamp(0.0, 1.0);
            let passed = score >= criterion.threshold;

            total_score += score * criterion.weight;
            per_criterion_score.insert(criterion.name.clone(), score);
            per_criterion_passed.insert(criterion.name.clone(), passed);
            if !passed {
                failed.push(format!(
                    "{} {:.2} < {:.2}",
                    criterion.name, score, criterion.threshold
                ));
            }
        }

        let quality_score = total_score / rubric.total_weight();
        let passed = failed.is_empty();
        let feedback = if passed {
            format!("{}: all criteria met (quality {:.2})", quest.title, quality_score)
        } else {
            format!("{}: below threshold on {}", quest.title, failed.join(", "))
        };

        debug!(
            parent: &self.span,
            quest = %quest.id,
            scorer = self.scorer.id(),
            quality = quality_score,
            passed = passed,
            "Rubric evaluation finished"
        );

        Ok(JudgeResult {
            passed,
            quality_score,
            per_criterion_score,
            per_criterion_passed,
            feedback,
        })
    }

    /// Rubric evaluation when the template declares criteria, baseline
    /// evaluation otherwise.
    pub async fn evaluate_quest(
        &self,
        template: &QuestTemplate,
        output: &QuestValue,
        profile: JudgeProfile,
    ) -> Result<JudgeResult, JudgeError> {
        match profile.rubric_for(template) {
            Some(rubric) => self.evaluate_with_rubric(template, output, &rubric).await,
            None => Ok(self.evaluate(template, output)),
        }
    }
}

impl Default for Judge {
    fn default() -> Self {
        Self::new(Arc::new(FixedScorer::default()))
    }
}
