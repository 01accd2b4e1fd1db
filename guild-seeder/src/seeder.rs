//! Entry point dispatching a [`SeedConfig`] to the matching strategy.

use std::sync::Arc;
use tracing::{info_span, Span};

use guild_core::{Board, ExecutionContext, NoopProgress, ProgressSink, Store};
use quest_engine::Judge;

use crate::arena::{ArenaOrchestrator, EchoExecutor, QuestExecutor};
use crate::config::{SeedConfig, SeedMode};
use crate::error::{SeedError, SeedFailure};
use crate::result::SeedResult;
use crate::roster::RosterSeeder;

/// Runs seeding configurations against a store and board.
pub struct Seeder {
    store: Arc<dyn Store>,
    board: Arc<dyn Board>,
    executor: Arc<dyn QuestExecutor>,
    judge: Arc<Judge>,
    progress: Arc<dyn ProgressSink>,
    span: Span,
}

impl Seeder {
    pub fn new(store: Arc<dyn Store>, board: Arc<dyn Board>) -> Self {
        Self {
            store,
            board,
            executor: Arc::new(EchoExecutor),
            judge: Arc::new(Judge::default()),
            progress: Arc::new(NoopProgress),
            span: Span::none(),
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn QuestExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_judge(mut self, judge: Judge) -> Self {
        self.judge = Arc::new(judge);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Parent span for every run.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Validate, then run the strategy selected by `config.mode`.
    pub async fn run(
        &self,
        config: &SeedConfig,
        ctx: &ExecutionContext,
    ) -> Result<SeedResult, SeedFailure> {
        if let Err(e) = config.validate() {
            return Err(SeedFailure::new(
                e,
                SeedResult::new(config.mode, config.dry_run),
            ));
        }

        let span = info_span!(parent: &self.span, "seed", mode = %config.mode);

        match (config.mode, &config.arena, &config.roster) {
            (SeedMode::TrainingArena, Some(arena), _) => {
                ArenaOrchestrator::new(arena.clone(), self.store.clone(), self.board.clone())
                    .with_executor(self.executor.clone())
                    .with_judge(self.judge.clone())
                    .with_progress(self.progress.clone())
                    .with_span(span)
                    .run(ctx, config.dry_run, config.idempotent)
                    .await
            }
            (SeedMode::TieredRoster, _, Some(roster)) => {
                RosterSeeder::new(roster.clone(), self.store.clone())
                    .with_progress(self.progress.clone())
                    .with_span(span)
                    .seed(ctx, config.dry_run, config.idempotent)
                    .await
            }
            (mode, _, _) => Err(SeedFailure::new(
                SeedError::Configuration(format!("no section configured for {}", mode)),
                SeedResult::new(mode, config.dry_run),
            )),
        }
    }
}
