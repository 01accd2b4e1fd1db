//! Rubrics and judge profiles.

use serde::{Deserialize, Serialize};

use crate::judge::JudgeError;
use crate::templates::QuestTemplate;

/// One weighted, thresholded scoring criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeCriterion {
    pub name: String,
    /// Relative weight, strictly positive
    pub weight: f64,
    /// Minimum passing score in `[0, 1]`
    pub threshold: f64,
}

impl JudgeCriterion {
    pub fn new(name: impl Into<String>, weight: f64, threshold: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            threshold,
        }
    }
}

/// A validated, ordered list of criteria with a nonzero total weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rubric {
    criteria: Vec<JudgeCriterion>,
    total_weight: f64,
}

impl Rubric {
    /// Validate criteria. Weights must be positive and finite, thresholds in
    /// `[0, 1]`, and the total weight nonzero.
    pub fn new(criteria: Vec<JudgeCriterion>) -> Result<Self, JudgeError> {
        if criteria.is_empty() {
            return Err(JudgeError::EmptyRubric);
        }

        for criterion in &criteria {
            if !criterion.weight.is_finite() || criterion.weight <= 0.0 {
                return Err(JudgeError::InvalidWeight {
                    criterion: criterion.name.clone(),
                    weight: criterion.weight,
                });
            }
            if !(0.0..=1.0).contains(&criterion.threshold) {
                return Err(JudgeError::InvalidThreshold {
                    criterion: criterion.name.clone(),
                    threshold: criterion.threshold,
                });
            }
        }

        let total_weight: f64 = criteria.iter().map(|c| c.weight).sum();
        if total_weight <= 0.0 || !total_weight.is_finite() {
            return Err(JudgeError::DivideByZeroGuard);
        }

        Ok(Self {
            criteria,
            total_weight,
        })
    }

    pub fn criteria(&self) -> &[JudgeCriterion] {
        &self.criteria
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }
}

/// Strictness used to derive rubrics from template criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgeProfile {
    Lenient,
    Standard,
    Strict,
}

impl Default for JudgeProfile {
    fn default() -> Self {
        Self::Standard
    }
}

impl JudgeProfile {
    /// Pass threshold applied to every criterion.
    pub fn threshold(&self) -> f64 {
        match self {
            Self::Lenient => 0.5,
            Self::Standard => 0.7,
            Self::Strict => 0.85,
        }
    }

    /// Equal-weight rubric over the template's criteria, or `None` when the
    /// template declares none.
    pub fn rubric_for(&self, template: &QuestTemplate) -> Option<Rubric> {
        if template.criteria.is_empty() {
            return None;
        }
        let criteria = template
            .criteria
            .iter()
            .map(|name| JudgeCriterion::new(name.clone(), 1.0, self.threshold()))
            .collect();
        Rubric::new(criteria).ok()
    }
}
