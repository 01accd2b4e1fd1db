//! Tiered roster seeding.
//!
//! Places agents directly at configured levels, founds guilds, and wires
//! membership. Every failure is per item; only cancellation ends the run.

use std::sync::Arc;
use tracing::{debug, info, warn, Span};

use guild_core::{
    instance_for, Agent, ExecutionContext, Guild, NoopProgress, ProgressEvent, ProgressPhase,
    ProgressSink, Store,
};

use crate::config::{GuildSpec, RosterAgentSpec, RosterConfig, SeedMode};
use crate::error::{SeedError, SeedFailure};
use crate::result::SeedResult;

/// Seeds a roster of pre-leveled agents and guilds.
pub struct RosterSeeder {
    config: RosterConfig,
    store: Arc<dyn Store>,
    progress: Arc<dyn ProgressSink>,
    span: Span,
}

impl RosterSeeder {
    pub fn new(config: RosterConfig, store: Arc<dyn Store>) -> Self {
        Self {
            config,
            store,
            progress: Arc::new(NoopProgress),
            span: Span::none(),
        }
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

    pub fn config(&self) -> &RosterConfig {
        &self.config
    }

    /// Run guild then agent phases.
    pub async fn seed(
        &self,
        ctx: &ExecutionContext,
        dry_run: bool,
        idempotent: bool,
    ) -> Result<SeedResult, SeedFailure> {
        let mut result = SeedResult::new(SeedMode::TieredRoster, dry_run);

        if let Err(e) = self.config.validate() {
            return Err(SeedFailure::new(e, result));
        }

        info!(
            parent: &self.span,
            roster = %self.config.name,
            guilds = self.config.guilds.len(),
            agents = self.config.agent_count(),
            dry_run,
            idempotent,
            "Seeding roster"
        );

        if let Err(e) = self.seed_guilds(ctx, dry_run, &mut result).await {
            return Err(SeedFailure::new(e, result));
        }
        if let Err(e) = self.seed_agents(ctx, dry_run, idempotent, &mut result).await {
            return Err(SeedFailure::new(e, result));
        }

        result.finish();
        info!(
            parent: &self.span,
            roster = %self.config.name,
            created = result.agents_created,
            skipped = result.agents_skipped,
            guilds = result.guilds_created,
            npcs = result.npcs_spawned,
            errors = result.errors.len(),
            duration_ms = result.duration.as_millis() as u64,
            "Roster seeded"
        );
        Ok(result)
    }

    // ========================================================================
    // Guild phase
    // ========================================================================

    async fn seed_guilds(
        &self,
        ctx: &ExecutionContext,
        dry_run: bool,
        result: &mut SeedResult,
    ) -> Result<(), SeedError> {
        let total = self.config.guilds.len() as u32;

        for (i, spec) in self.config.guilds.iter().enumerate() {
            ctx.check()?;
            self.progress.report(&ProgressEvent::new(
                ProgressPhase::Guilds,
                i as u32 + 1,
                total,
                format!("Founding guild {}", spec.name),
            ));

            if dry_run {
                debug!(parent: &self.span, guild = %spec.id, "Dry run: would found guild");
                result.guilds_created += 1;
                continue;
            }

            match self.found_guild(spec).await {
                Ok(()) => result.guilds_created += 1,
                Err(e) => {
                    warn!(parent: &self.span, guild = %spec.id, error = %e, "Failed to found guild");
                    result.record_error(format!("guild {}: {}", spec.id, e));
                }
            }
        }
        Ok(())
    }

    async fn found_guild(&self, spec: &GuildSpec) -> Result<(), SeedError> {
        let guild = Guild::found(
            spec.id.clone(),
            &spec.name,
            &spec.description,
            &spec.culture,
            spec.min_level,
        );
        self.store
            .put_guild(&spec.id, guild)
            .await
            .map_err(|source| SeedError::Creation {
                name: spec.id.to_string(),
                source,
            })?;
        info!(parent: &self.span, guild = %spec.id, name = %spec.name, "Guild founded");
        Ok(())
    }

    // ========================================================================
    // Agent phase
    // ========================================================================

    async fn seed_agents(
        &self,
        ctx: &ExecutionContext,
        dry_run: bool,
        idempotent: bool,
        result: &mut SeedResult,
    ) -> Result<(), SeedError> {
        let total = self.config.agent_count();
        let mut current = 0;

        for spec in &self.config.agents {
            for name in spec.expand_names() {
                ctx.check()?;
                current += 1;
                self.progress.report(
                    &ProgressEvent::new(ProgressPhase::Agents, current, total, "Placing agent")
                        .with_agent(&name),
                );

                if idempotent && !dry_run {
                    match self.store.find_agent_by_name(&name).await {
                        Ok(Some(existing)) => {
                            debug!(parent: &self.span, agent = %name, "Agent exists, skipping");
                            result.agents_skipped += 1;
                            result.agents.push(existing.summary());
                            continue;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!(parent: &self.span, agent = %name, error = %e, "Lookup failed");
                            result.record_error(format!("agent {}: lookup failed: {}", name, e));
                            continue;
                        }
                    }
                }

                let agent = self.build_agent(spec, &name);

                if dry_run {
                    debug!(parent: &self.span, agent = %name, level = agent.level, "Dry run: would place agent");
                    result.agents_created += 1;
                    if spec.is_npc {
                        result.npcs_spawned += 1;
                    }
                    result.agents.push(agent.summary());
                    continue;
                }

                match self.place_agent(spec, agent, result).await {
                    Ok(agent) => {
                        result.agents_created += 1;
                        if agent.is_npc {
                            result.npcs_spawned += 1;
                        }
                        result.agents.push(agent.summary());
                    }
                    Err(e) => {
                        warn!(parent: &self.span, agent = %name, error = %e, "Failed to place agent");
                        result.record_error(e.to_string());
                    }
                }
            }
        }
        Ok(())
    }

    fn build_agent(&self, spec: &RosterAgentSpec, name: &str) -> Agent {
        let id = self.store.config().agent_entity_id(&instance_for(name));
        Agent::new(id, name, spec.level)
            .with_skills(spec.skills.iter().cloned())
            .with_novice_proficiencies()
            .with_npc(spec.is_npc)
            .with_llm_config(spec.llm_config.clone())
    }

    /// Persist, then join the configured guild. Nothing joins a guild unless
    /// the agent is stored. A failed join is recorded and the agent is
    /// rewritten without that membership.
    async fn place_agent(
        &self,
        spec: &RosterAgentSpec,
        mut agent: Agent,
        result: &mut SeedResult,
    ) -> Result<Agent, SeedError> {
        let instance = instance_for(&agent.name);
        if let Some(guild_id) = &spec.guild_id {
            agent.guilds.insert(guild_id.clone());
        }

        self.store
            .put_agent(&instance, agent.clone())
            .await
            .map_err(|source| SeedError::Creation {
                name: agent.name.clone(),
                source,
            })?;

        if let Some(guild_id) = &spec.guild_id {
            let member = agent.id.clone();
            let joined = self
                .store
                .update_guild(guild_id, &move |guild: &mut Guild| {
                    guild.add_member(member.clone());
                })
                .await;

            if let Err(e) = joined {
                warn!(parent: &self.span, agent = %agent.name, guild = %guild_id, error = %e, "Failed to join guild");
                result.record_error(format!("agent {}: join {}: {}", agent.name, guild_id, e));

                agent.guilds.remove(guild_id);
                if let Err(e) = self.store.put_agent(&instance, agent.clone()).await {
                    result.record_error(format!("agent {}: drop membership: {}", agent.name, e));
                }
            }
        }

        info!(
            parent: &self.span,
            agent = %agent.name,
            level = agent.level,
            tier = %agent.tier,
            npc = agent.is_npc,
            "Agent placed"
        );
        Ok(agent)
    }
}
