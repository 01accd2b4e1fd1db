//! Training arena: levels agents up through simulated quests.
//!
//! Runs as sequential phases:
//!
//! 1. Load the quest template index (fatal on failure)
//! 2. Create or reuse one level-1 trainee per profile (fatal on failure)
//! 3. Find or spawn mentors (non-fatal)
//! 4. Training rounds until every trainee reaches its target level or the
//!    quest budget runs out
//!
//! Round failures never abort the run. Every attempt, failed or not,
//! consumes budget.

pub mod executor;
pub mod mentors;

pub use executor::{EchoExecutor, QuestExecutor};

use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Span};

use guild_core::{
    instance_for, Agent, AgentId, Board, ExecutionContext, NoopProgress, PostedQuest,
    ProgressEvent, ProgressPhase, ProgressSink, QuestDraft, QuestReceipt, Store, MIN_LEVEL,
};
use quest_engine::{
    to_verdict, DifficultySelector, Judge, QuestTemplate, QuestTemplateIndex, TemplateSource,
};

use crate::config::{AgentProfile, ArenaConfig, SeedMode};
use crate::error::{MentorBootstrapError, RoundError, SeedError, SeedFailure};
use crate::result::SeedResult;
use crate::roster::RosterSeeder;

/// Trainee name for the profile at 1-based `ordinal`.
pub fn trainee_name(profile: &AgentProfile, ordinal: usize) -> String {
    let slug = instance_for(&profile.name);
    if slug.is_empty() {
        format!("trainee-{}", ordinal)
    } else {
        format!("{}-{}", slug, ordinal)
    }
}

/// A trainee's latest known state and its goal.
#[derive(Debug, Clone)]
struct Trainee {
    agent: Agent,
    instance: String,
    target: u8,
    mentor: Option<AgentId>,
}

impl Trainee {
    fn at_target(&self) -> bool {
        self.agent.level >= self.target
    }
}

/// Orchestrates a training arena run.
pub struct ArenaOrchestrator {
    config: ArenaConfig,
    store: Arc<dyn Store>,
    board: Arc<dyn Board>,
    executor: Arc<dyn QuestExecutor>,
    judge: Arc<Judge>,
    progress: Arc<dyn ProgressSink>,
    span: Span,
}

impl ArenaOrchestrator {
    pub fn new(config: ArenaConfig, store: Arc<dyn Store>, board: Arc<dyn Board>) -> Self {
        Self {
            config,
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

    pub fn with_judge(mut self, judge: Arc<Judge>) -> Self {
        self.judge = judge;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Log under the given span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Run every phase. Fatal errors return the partial result alongside.
    pub async fn run(
        &self,
        ctx: &ExecutionContext,
        dry_run: bool,
        idempotent: bool,
    ) -> Result<SeedResult, SeedFailure> {
        let mut result = SeedResult::new(SeedMode::TrainingArena, dry_run);
        if let Err(e) = self.config.validate() {
            return Err(SeedFailure::new(e, result));
        }

        info!(
            parent: &self.span,
            agents = self.config.agents.len(),
            domain = %self.config.quest_domain,
            budget_per_agent = self.config.max_training_quests,
            dry_run,
            idempotent,
            "Starting training arena"
        );

        let mut trainees = Vec::with_capacity(self.config.agents.len());
        let outcome = self
            .run_phases(ctx, dry_run, idempotent, &mut trainees, &mut result)
            .await;

        if let Err(e) = outcome {
            warn!(parent: &self.span, error = %e, "Training arena aborted");
            prepend_summaries(&mut result, &trainees);
            return Err(SeedFailure::new(e, result));
        }

        if !dry_run {
            for trainee in trainees.iter_mut() {
                self.refresh(trainee).await;
            }
        }
        prepend_summaries(&mut result, &trainees);
        result.finish();

        info!(
            parent: &self.span,
            created = result.agents_created,
            skipped = result.agents_skipped,
            npcs = result.npcs_spawned,
            quests_run = result.quests_run,
            quests_completed = result.quests_completed,
            at_target = trainees.iter().filter(|t| t.at_target()).count(),
            errors = result.errors.len(),
            duration_ms = result.duration.as_millis() as u64,
            "Training arena finished"
        );
        Ok(result)
    }

    async fn run_phases(
        &self,
        ctx: &ExecutionContext,
        dry_run: bool,
        idempotent: bool,
        trainees: &mut Vec<Trainee>,
        result: &mut SeedResult,
    ) -> Result<(), SeedError> {
        ctx.check()?;
        let index = Arc::new(self.load_templates().await?);

        self.bootstrap_agents(ctx, dry_run, idempotent, trainees, result)
            .await?;

        if self.config.mentored_training {
            self.ensure_mentors(ctx, dry_run, trainees, result).await?;
        }

        if dry_run {
            info!(parent: &self.span, "Dry run: skipping training rounds");
            return Ok(());
        }

        self.train(ctx, index, trainees, result).await
    }

    // ========================================================================
    // Phase 1: templates
    // ========================================================================

    async fn load_templates(&self) -> Result<QuestTemplateIndex, SeedError> {
        let source =
            TemplateSource::from_config(&self.config.quest_domain, self.config.quest_file.as_deref());
        let index = QuestTemplateIndex::load(&source).await?;

        info!(
            parent: &self.span,
            domain = index.domain(),
            templates = index.len(),
            "Quest templates loaded"
        );
        Ok(index)
    }

    // ========================================================================
    // Phase 2: trainees
    // ========================================================================

    async fn bootstrap_agents(
        &self,
        ctx: &ExecutionContext,
        dry_run: bool,
        idempotent: bool,
        trainees: &mut Vec<Trainee>,
        result: &mut SeedResult,
    ) -> Result<(), SeedError> {
        let target = self.config.target_levels.convergence_level();
        let goals = self.config.target_levels.tier_goals(self.config.agents.len());
        let total = self.config.agents.len() as u32;

        for (i, (profile, goal)) in self.config.agents.iter().zip(goals).enumerate() {
            ctx.check()?;
            let name = trainee_name(profile, i + 1);
            let instance = instance_for(&name);
            self.progress.report(
                &ProgressEvent::new(ProgressPhase::Agents, i as u32 + 1, total, "Preparing trainee")
                    .with_agent(&name),
            );

            if idempotent && !dry_run {
                let existing = self
                    .store
                    .find_agent_by_name(&name)
                    .await
                    .map_err(|source| SeedError::Creation {
                        name: name.clone(),
                        source,
                    })?;
                if let Some(agent) = existing {
                    debug!(parent: &self.span, agent = %name, level = agent.level, "Reusing trainee");
                    result.agents_skipped += 1;
                    trainees.push(Trainee {
                        agent,
                        instance,
                        target,
                        mentor: None,
                    });
                    continue;
                }
            }

            let agent = Agent::new(
                self.store.config().agent_entity_id(&instance),
                name.clone(),
                MIN_LEVEL,
            )
            .with_skills(profile.skills.iter().cloned())
            .with_llm_config(profile.llm_config.clone());

            if dry_run {
                debug!(parent: &self.span, agent = %name, target, goal, "Dry run: would create trainee");
            } else {
                self.store
                    .put_agent(&instance, agent.clone())
                    .await
                    .map_err(|source| SeedError::Creation {
                        name: name.clone(),
                        source,
                    })?;
                info!(parent: &self.span, agent = %name, target, goal, "Trainee created");
            }

            result.agents_created += 1;
            trainees.push(Trainee {
                agent,
                instance,
                target,
                mentor: None,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Phase 3: mentors
    // ========================================================================

    /// Assign mentors to trainees. Only cancellation escapes; every other
    /// failure is a warning plus an error entry.
    async fn ensure_mentors(
        &self,
        ctx: &ExecutionContext,
        dry_run: bool,
        trainees: &mut [Trainee],
        result: &mut SeedResult,
    ) -> Result<(), SeedError> {
        let mentor_ids = match self.resolve_mentors(ctx, dry_run, trainees, result).await {
            Ok(ids) => ids,
            Err(MentorBootstrapError::Cancelled(e)) => return Err(e.into()),
            Err(e) => {
                warn!(parent: &self.span, error = %e, "Continuing without mentors");
                result.record_error(e.to_string());
                return Ok(());
            }
        };

        if mentor_ids.is_empty() {
            warn!(parent: &self.span, "No mentors available; training unmentored");
            return Ok(());
        }

        let assigned =
            mentors::assign_mentors(trainees.len(), &mentor_ids, self.config.trainees_per_mentor);
        let unmentored = assigned.iter().filter(|m| m.is_none()).count();
        for (trainee, mentor) in trainees.iter_mut().zip(assigned) {
            trainee.mentor = mentor;
        }

        info!(
            parent: &self.span,
            mentors = mentor_ids.len(),
            unmentored,
            "Mentors assigned"
        );
        Ok(())
    }

    async fn resolve_mentors(
        &self,
        ctx: &ExecutionContext,
        dry_run: bool,
        trainees: &[Trainee],
        result: &mut SeedResult,
    ) -> Result<Vec<AgentId>, MentorBootstrapError> {
        let exclude: BTreeSet<AgentId> = trainees.iter().map(|t| t.agent.id.clone()).collect();
        let found = mentors::find_mentors(self.store.as_ref(), &exclude).await?;
        if !found.is_empty() {
            debug!(parent: &self.span, mentors = found.len(), "Found existing mentors");
            return Ok(found.into_iter().map(|agent| agent.id).collect());
        }
        if self.config.bootstrap_mentors == 0 {
            return Ok(Vec::new());
        }

        info!(
            parent: &self.span,
            count = self.config.bootstrap_mentors,
            "No qualified mentors, spawning NPC mentors"
        );

        let stored = self.store.list_all_agents().await?;
        let first_ordinal = mentors::next_mentor_ordinal(
            stored
                .iter()
                .map(|agent| agent.name.as_str())
                .chain(trainees.iter().map(|t| t.agent.name.as_str())),
        );

        let seeder = RosterSeeder::new(
            mentors::mentor_roster(self.config.bootstrap_mentors, first_ordinal),
            self.store.clone(),
        )
        .with_progress(self.progress.clone())
        .with_span(info_span!(parent: &self.span, "mentor_bootstrap"));

        let spawned = match seeder.seed(ctx, dry_run, true).await {
            Ok(spawned) => spawned,
            Err(failure) => {
                return Err(match failure.error {
                    SeedError::Cancelled(e) => MentorBootstrapError::Cancelled(e),
                    other => MentorBootstrapError::Spawn(other.to_string()),
                })
            }
        };

        let mut ids: Vec<AgentId> = spawned.agents.iter().map(|a| a.id.clone()).collect();
        result.absorb(spawned);
        if !dry_run {
            let qualified = mentors::find_mentors(self.store.as_ref(), &exclude).await?;
            ids.retain(|id| qualified.iter().any(|agent| &agent.id == id));
        }
        if ids.is_empty() {
            return Err(MentorBootstrapError::Spawn(
                "no mentor could be created".to_string(),
            ));
        }
        Ok(ids)
    }

    // ========================================================================
    // Phase 4: training rounds
    // ========================================================================

    async fn train(
        &self,
        ctx: &ExecutionContext,
        index: Arc<QuestTemplateIndex>,
        trainees: &mut [Trainee],
        result: &mut SeedResult,
    ) -> Result<(), SeedError> {
        let selector = DifficultySelector::with_mode(index, self.config.selection);
        let budget = self
            .config
            .max_training_quests
            .saturating_mul(trainees.len() as u32);
        let mut round = 0u32;

        while result.quests_run < budget {
            ctx.check()?;

            if trainees.iter().all(Trainee::at_target) {
                info!(parent: &self.span, rounds = round, "Every trainee reached its target");
                return Ok(());
            }

            let average = average_level(trainees);
            let Some(template) = selector.select_for_level(average) else {
                warn!(parent: &self.span, level = average, "No quest template available");
                result.record_error(format!("no quest template available for level {}", average));
                return Ok(());
            };

            round += 1;
            let pending: Vec<usize> = (0..trainees.len())
                .filter(|&i| !trainees[i].at_target())
                .collect();

            debug!(
                parent: &self.span,
                round,
                average_level = average,
                quest = %template.id,
                difficulty = %template.difficulty,
                agents = pending.len(),
                "Training round"
            );

            if self.config.round_concurrency <= 1 {
                for i in pending {
                    let outcome = self.attempt(ctx, &trainees[i], template).await;
                    self.settle(&mut trainees[i], template, outcome, budget, result)
                        .await?;
                }
            } else {
                let roster: &[Trainee] = trainees;
                let outcomes: Vec<(usize, Result<QuestReceipt, RoundError>)> =
                    stream::iter(pending)
                        .map(move |i| async move {
                            (i, self.attempt(ctx, &roster[i], template).await)
                        })
                        .buffer_unordered(self.config.round_concurrency)
                        .collect()
                        .await;

                for (i, outcome) in outcomes {
                    self.settle(&mut trainees[i], template, outcome, budget, result)
                        .await?;
                }
            }
        }

        info!(
            parent: &self.span,
            rounds = round,
            quests_run = result.quests_run,
            "Quest budget exhausted"
        );
        Ok(())
    }

    /// One quest lifecycle for one trainee.
    async fn attempt(
        &self,
        ctx: &ExecutionContext,
        trainee: &Trainee,
        template: &QuestTemplate,
    ) -> Result<QuestReceipt, RoundError> {
        ctx.check()?;

        let base_xp =
            (template.difficulty.base_xp() as f64 * self.config.xp_multiplier).floor() as u64;
        let draft = QuestDraft {
            template_id: template.id.clone(),
            title: template.title.clone(),
            description: template.description.clone(),
            difficulty: template.difficulty,
            required_skills: template.skills.clone(),
            input: template.input.clone(),
            base_xp,
            mentor: trainee.mentor.clone(),
        };

        let quest = self.board.post_quest(draft).await?;
        self.board.claim_quest(&quest.id, &trainee.agent.id).await?;

        let outcome = self.complete(trainee, template, &quest, base_xp).await;
        if outcome.is_err() {
            if let Err(e) = self.board.abandon_quest(&quest.id).await {
                warn!(
                    parent: &self.span,
                    agent = %trainee.agent.name,
                    quest_id = %quest.id,
                    error = %e,
                    "Failed to release trainee"
                );
            }
        }
        outcome
    }

    /// Start, execute, judge and submit a quest the trainee already claimed.
    async fn complete(
        &self,
        trainee: &Trainee,
        template: &QuestTemplate,
        quest: &PostedQuest,
        base_xp: u64,
    ) -> Result<QuestReceipt, RoundError> {
        self.board.start_quest(&quest.id).await?;

        let output = self.executor.execute(&trainee.agent, quest).await?;
        let judged = self
            .judge
            .evaluate_quest(template, &output, self.config.judge_profile)
            .await?;
        let verdict = to_verdict(&judged, base_xp);

        Ok(self.board.submit_result(&quest.id, output, verdict).await?)
    }

    /// Count an attempt, surface its outcome, and re-read the trainee.
    async fn settle(
        &self,
        trainee: &mut Trainee,
        template: &QuestTemplate,
        outcome: Result<QuestReceipt, RoundError>,
        budget: u32,
        result: &mut SeedResult,
    ) -> Result<(), SeedError> {
        result.quests_run += 1;

        match outcome {
            Ok(receipt) => {
                result.quests_completed += 1;
                if receipt.leveled_up() {
                    info!(
                        parent: &self.span,
                        agent = %trainee.agent.name,
                        from = receipt.level_before,
                        to = receipt.level_after,
                        "Trainee leveled up"
                    );
                }
                debug!(
                    parent: &self.span,
                    agent = %trainee.agent.name,
                    quest = %receipt.quest_id,
                    xp_delta = receipt.xp_delta,
                    "Quest settled"
                );
            }
            Err(RoundError::Cancelled(e)) => return Err(e.into()),
            Err(e) => {
                warn!(
                    parent: &self.span,
                    agent = %trainee.agent.name,
                    quest = %template.id,
                    executor = self.executor.id(),
                    error = %e,
                    "Training round failed"
                );
                result.record_error(format!("{} on {}: {}", trainee.agent.name, template.id, e));
            }
        }

        self.progress.report(
            &ProgressEvent::new(
                ProgressPhase::Training,
                result.quests_run,
                budget,
                format!("Round quest {}", template.title),
            )
            .with_agent(&trainee.agent.name)
            .with_quest(&template.title),
        );

        self.refresh(trainee).await;
        Ok(())
    }

    /// Re-read a trainee, keeping the in-memory copy when the read fails.
    async fn refresh(&self, trainee: &mut Trainee) {
        match self.store.get_agent(&trainee.instance).await {
            Ok(agent) => trainee.agent = agent,
            Err(e) => debug!(
                parent: &self.span,
                agent = %trainee.agent.name,
                error = %e,
                "Keeping cached trainee state"
            ),
        }
    }
}

/// Floor of the mean trainee level.
fn average_level(trainees: &[Trainee]) -> u8 {
    if trainees.is_empty() {
        return MIN_LEVEL;
    }
    let sum: u32 = trainees.iter().map(|t| u32::from(t.agent.level)).sum();
    (sum / trainees.len() as u32) as u8
}

fn prepend_summaries(result: &mut SeedResult, trainees: &[Trainee]) {
    let summaries: Vec<_> = trainees.iter().map(|t| t.agent.summary()).collect();
    result.agents.splice(0..0, summaries);
}
