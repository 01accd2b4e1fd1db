//! Quest Engine - templates, difficulty selection and judging
//!
//! - Template sources (bundled per domain, or a JSON file at runtime)
//! - A difficulty-bucketed template index
//! - Level-to-template selection with downward fallback
//! - Rubric judging and verdict conversion
//!
//! # Architecture
//!
//! ```text
//! TemplateSource ──load──▶ QuestTemplateIndex ◀── DifficultySelector
//!                                                      │
//!                                      level ──────────┘
//!
//! QuestTemplate + output ──▶ Judge ──▶ JudgeResult ──to_verdict──▶ Verdict
//!                             │
//!                      CriterionScorer
//! ```

pub mod judge;
pub mod selector;
pub mod templates;

pub use judge::{
    to_verdict, CriterionScorer, FixedScorer, Judge, JudgeCriterion, JudgeError, JudgeProfile,
    JudgeResult, Rubric, ScriptedScorer,
};
pub use selector::{target_difficulty, DifficultySelector, SelectionMode};
pub use templates::{QuestTemplate, QuestTemplateFile, QuestTemplateIndex, TemplateLoadError, TemplateSource};
