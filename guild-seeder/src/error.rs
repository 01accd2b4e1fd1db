//! Error types for seeding runs.

use guild_core::{BoardError, ContextError, StoreError};
use quest_engine::{JudgeError, TemplateLoadError};

use crate::result::SeedResult;

/// Fatal errors. Any of these ends the run with `success = false`.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// Invalid or incomplete configuration, raised before any side effect
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Quest templates could not be loaded
    #[error("Template load error: {0}")]
    TemplateLoad(#[from] TemplateLoadError),

    /// Store write failed while creating an entity
    #[error("Failed to create {name}: {source}")]
    Creation {
        name: String,
        #[source]
        source: StoreError,
    },

    /// Execution context cancelled or timed out
    #[error("Run cancelled: {0}")]
    Cancelled(#[from] ContextError),
}

/// Failure of a single training round. Never fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum RoundError {
    #[error("Board error: {0}")]
    Board(#[from] BoardError),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Judge error: {0}")]
    Judge(#[from] JudgeError),

    /// Context stopped mid-round; the caller escalates this one
    #[error("Round cancelled: {0}")]
    Cancelled(#[from] ContextError),
}

/// Failure to find or spawn mentors. Never fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum MentorBootstrapError {
    #[error("Mentor lookup failed: {0}")]
    Lookup(#[from] StoreError),

    #[error("Mentor spawn failed: {0}")]
    Spawn(String),

    /// Context stopped while spawning; the caller escalates this one
    #[error("Mentor bootstrap cancelled: {0}")]
    Cancelled(#[from] ContextError),
}

/// A fatal error together with whatever was accomplished before it.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct SeedFailure {
    #[source]
    pub error: SeedError,
    pub partial: Box<SeedResult>,
}

impl SeedFailure {
    /// Close out `partial` as failed and pair it with the error.
    pub fn new(error: SeedError, mut partial: SeedResult) -> Self {
        partial.success = false;
        partial.errors.push(error.to_string());
        partial.finish();
        Self {
            error,
            partial: Box::new(partial),
        }
    }
}

pub type Result<T> = std::result::Result<T, SeedError>;
