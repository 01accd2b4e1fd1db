//! Training arena integration tests against the in-memory store and board.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use guild_core::memory::{BoardOperation, InMemoryBoard, InMemoryStore};
use guild_core::{
    Agent, AgentId, AgentStatus, BroadcastProgress, ExecutionContext, PostedQuest, ProgressPhase, QuestValue,
    Store, Tier, TRAINING_SKILL,
};
use guild_seeder::{
    AgentProfile, ArenaConfig, ArenaOrchestrator, EchoExecutor, LevelDistribution, QuestExecutor,
    RoundError, SeedError,
};
use quest_engine::{FixedScorer, Judge, JudgeProfile, TemplateLoadError};

fn harness() -> (Arc<InMemoryStore>, Arc<InMemoryBoard>) {
    let store = Arc::new(InMemoryStore::new());
    let board = Arc::new(InMemoryBoard::new(store.clone()));
    (store, board)
}

fn arena(store: &Arc<InMemoryStore>, board: &Arc<InMemoryBoard>, config: ArenaConfig) -> ArenaOrchestrator {
    ArenaOrchestrator::new(config, store.clone(), board.clone())
}

fn scouts(n: usize) -> Vec<AgentProfile> {
    (0..n)
        .map(|_| AgentProfile::new("Scout").with_skills(["analysis"]))
        .collect()
}

/// Records the mentor carried by each quest it executes.
#[derive(Default)]
struct RecordingExecutor {
    mentors: Mutex<Vec<Option<AgentId>>>,
}

#[async_trait]
impl QuestExecutor for RecordingExecutor {
    fn id(&self) -> &str {
        "recording"
    }

    async fn execute(&self, agent: &Agent, quest: &PostedQuest) -> Result<QuestValue, RoundError> {
        self.mentors.lock().unwrap().push(quest.draft.mentor.clone());
        EchoExecutor.execute(agent, quest).await
    }
}

/// Cancels the shared context on its first execution.
struct CancellingExecutor {
    ctx: ExecutionContext,
}

#[async_trait]
impl QuestExecutor for CancellingExecutor {
    fn id(&self) -> &str {
        "cancelling"
    }

    async fn execute(&self, agent: &Agent, quest: &PostedQuest) -> Result<QuestValue, RoundError> {
        self.ctx.cancel();
        EchoExecutor.execute(agent, quest).await
    }
}

/// Fails every execution.
struct BrokenExecutor;

#[async_trait]
impl QuestExecutor for BrokenExecutor {
    fn id(&self) -> &str {
        "broken"
    }

    async fn execute(&self, _agent: &Agent, _quest: &PostedQuest) -> Result<QuestValue, RoundError> {
        Err(RoundError::Execution("tool crashed".to_string()))
    }
}

#[tokio::test]
async fn test_early_convergence_stops_before_budget() {
    let (store, board) = harness();
    // Trivial quests pay 20 XP at the stub quality; level 2 costs 100.
    let config = ArenaConfig::new(scouts(1))
        .with_target_levels(LevelDistribution::uniform(2))
        .with_max_training_quests(50);

    let result = arena(&store, &board, config)
        .run(&ExecutionContext::new(), false, true)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.quests_run, 5);
    assert_eq!(result.quests_completed, 5);
    assert!(result.errors.is_empty());
    assert_eq!(result.agents[0].level, 2);
    assert_eq!(store.get_agent("scout-1").await.unwrap().level, 2);
}

#[tokio::test]
async fn test_tier_goals_do_not_extend_training() {
    let (store, board) = harness();
    let config = ArenaConfig::new(scouts(1))
        .with_target_levels(LevelDistribution::uniform(2).with_tier_count(Tier::Journeyman, 1))
        .with_max_training_quests(50);

    let result = arena(&store, &board, config)
        .run(&ExecutionContext::new(), false, true)
        .await
        .unwrap();

    assert_eq!(result.quests_run, 5);
    assert_eq!(store.get_agent("scout-1").await.unwrap().level, 2);
}

#[tokio::test]
async fn test_budget_exhaustion_is_success() {
    let (store, board) = harness();
    let config = ArenaConfig::new(scouts(1))
        .with_target_levels(LevelDistribution::uniform(20))
        .with_max_training_quests(3);

    let result = arena(&store, &board, config)
        .run(&ExecutionContext::new(), false, true)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.quests_run, 3);
    assert_eq!(board.submission_count(), 3);

    let scout = store.get_agent("scout-1").await.unwrap();
    assert_eq!(scout.level, 1);
    assert_eq!(scout.xp, 60);
    assert!(scout.is_idle());
}

#[tokio::test]
async fn test_failed_rounds_consume_budget() {
    let (store, board) = harness();
    board.fail_operation(BoardOperation::Claim).await;
    let config = ArenaConfig::new(scouts(2)).with_max_training_quests(2);

    let result = arena(&store, &board, config)
        .run(&ExecutionContext::new(), false, true)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.quests_run, 4);
    assert_eq!(result.quests_completed, 0);
    assert_eq!(result.errors.len(), 4);
    assert_eq!(board.submission_count(), 0);
}

#[tokio::test]
async fn test_failed_round_releases_trainee() {
    let (store, board) = harness();
    let config = ArenaConfig::new(scouts(1)).with_max_training_quests(2);

    let result = arena(&store, &board, config)
        .with_executor(Arc::new(BrokenExecutor))
        .run(&ExecutionContext::new(), false, true)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.quests_run, 2);
    assert_eq!(result.errors.len(), 2);
    let scout = store.get_agent("scout-1").await.unwrap();
    assert!(scout.is_idle());
    assert_eq!((scout.level, scout.xp), (1, 0));
}

#[tokio::test]
async fn test_failed_submit_releases_trainee() {
    let (store, board) = harness();
    board.fail_operation(BoardOperation::Submit).await;
    let config = ArenaConfig::new(scouts(1)).with_max_training_quests(1);

    let result = arena(&store, &board, config)
        .run(&ExecutionContext::new(), false, true)
        .await
        .unwrap();

    assert_eq!(result.errors.len(), 1);
    assert!(store.get_agent("scout-1").await.unwrap().is_idle());
}

#[tokio::test]
async fn test_strict_judge_applies_penalties() {
    let (store, board) = harness();
    let mut config = ArenaConfig::new(scouts(1)).with_max_training_quests(4);
    config.judge_profile = JudgeProfile::Strict;

    let result = arena(&store, &board, config)
        .with_judge(Arc::new(Judge::new(Arc::new(FixedScorer::new(0.6)))))
        .run(&ExecutionContext::new(), false, true)
        .await
        .unwrap();

    // Lifecycles complete even when the verdict fails.
    assert_eq!(result.quests_completed, 4);
    let scout = store.get_agent("scout-1").await.unwrap();
    assert_eq!(scout.level, 1);
    assert_eq!(scout.xp, 0);
}

#[tokio::test]
async fn test_rerun_reuses_trainees() {
    let (store, board) = harness();
    let config = ArenaConfig::new(scouts(2)).with_max_training_quests(1);

    let first = arena(&store, &board, config.clone())
        .run(&ExecutionContext::new(), false, true)
        .await
        .unwrap();
    assert_eq!(first.agents_created, 2);

    let second = arena(&store, &board, config)
        .run(&ExecutionContext::new(), false, true)
        .await
        .unwrap();
    assert_eq!(second.agents_created, 0);
    assert_eq!(second.agents_skipped, 2);
    assert_eq!(store.agent_count().await, 2);

    let scout = store.get_agent("scout-1").await.unwrap();
    assert_eq!(scout.xp, 40);
}

#[tokio::test]
async fn test_dry_run_touches_nothing() {
    let (store, board) = harness();
    let config = ArenaConfig::new(scouts(2)).with_mentors(2);

    let result = arena(&store, &board, config)
        .run(&ExecutionContext::new(), true, true)
        .await
        .unwrap();

    assert!(result.dry_run);
    assert_eq!(result.agents_created, 4);
    assert_eq!(result.npcs_spawned, 2);
    assert_eq!(result.quests_run, 0);
    assert_eq!(store.agent_count().await, 0);
    assert_eq!(board.submission_count(), 0);
}

#[tokio::test]
async fn test_bootstrap_failure_is_fatal() {
    let store = Arc::new(InMemoryStore::new().with_failing_agent_writes(true));
    let board = Arc::new(InMemoryBoard::new(store.clone()));

    let failure = arena(&store, &board, ArenaConfig::new(scouts(2)))
        .run(&ExecutionContext::new(), false, true)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, SeedError::Creation { .. }));
    assert!(!failure.partial.success);
    assert_eq!(failure.partial.agents_created, 0);
    assert_eq!(failure.partial.quests_run, 0);
}

#[tokio::test]
async fn test_missing_quest_file_is_fatal() {
    let (store, board) = harness();
    let dir = tempfile::tempdir().unwrap();
    let config = ArenaConfig::new(scouts(1)).with_quest_file(dir.path().join("absent.json"));

    let failure = arena(&store, &board, config)
        .run(&ExecutionContext::new(), false, true)
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        SeedError::TemplateLoad(TemplateLoadError::Io { .. })
    ));
    assert_eq!(store.agent_count().await, 0);
}

#[tokio::test]
async fn test_unknown_domain_is_fatal() {
    let (store, board) = harness();
    let mut config = ArenaConfig::new(scouts(1));
    config.quest_domain = "alchemy".to_string();

    let failure = arena(&store, &board, config)
        .run(&ExecutionContext::new(), false, true)
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        SeedError::TemplateLoad(TemplateLoadError::UnknownDomain(_))
    ));
}

#[tokio::test]
async fn test_mentor_bootstrap_spawns_npcs() {
    let (store, board) = harness();
    let executor = Arc::new(RecordingExecutor::default());
    let config = ArenaConfig::new(scouts(3))
        .with_mentors(2)
        .with_max_training_quests(1);

    let result = arena(&store, &board, config)
        .with_executor(executor.clone())
        .run(&ExecutionContext::new(), false, true)
        .await
        .unwrap();

    assert_eq!(result.npcs_spawned, 2);
    let npcs: Vec<Agent> = store
        .list_all_agents()
        .await
        .unwrap()
        .into_iter()
        .filter(|a| a.is_npc)
        .collect();
    assert_eq!(npcs.len(), 2);
    for mentor in &npcs {
        assert!(mentor.has_skill(TRAINING_SKILL));
        assert!(mentor.tier >= Tier::Journeyman);
    }

    let mentor_1 = store.get_agent("mentor-1").await.unwrap().id;
    let mentor_2 = store.get_agent("mentor-2").await.unwrap().id;
    let seen = executor.mentors.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![Some(mentor_1.clone()), Some(mentor_2), Some(mentor_1)]
    );
}

#[tokio::test]
async fn test_existing_mentor_is_reused() {
    let (store, board) = harness();
    let veteran = Agent::new(store.config().agent_entity_id("veteran"), "veteran", 9)
        .with_skills([TRAINING_SKILL]);
    store.put_agent("veteran", veteran.clone()).await.unwrap();

    let executor = Arc::new(RecordingExecutor::default());
    let config = ArenaConfig::new(scouts(1))
        .with_mentors(2)
        .with_max_training_quests(1);

    let result = arena(&store, &board, config)
        .with_executor(executor.clone())
        .run(&ExecutionContext::new(), false, true)
        .await
        .unwrap();

    assert_eq!(result.npcs_spawned, 0);
    assert_eq!(store.agent_count().await, 2);
    assert_eq!(*executor.mentors.lock().unwrap(), vec![Some(veteran.id)]);
}

#[tokio::test]
async fn test_busy_mentor_is_not_reused() {
    let (store, board) = harness();
    let mut busy = Agent::new(store.config().agent_entity_id("mentor-1"), "mentor-1", 8)
        .with_skills([TRAINING_SKILL]);
    busy.status = AgentStatus::Busy;
    store.put_agent("mentor-1", busy.clone()).await.unwrap();

    let executor = Arc::new(RecordingExecutor::default());
    let config = ArenaConfig::new(scouts(2))
        .with_mentors(2)
        .with_max_training_quests(1);

    let result = arena(&store, &board, config)
        .with_executor(executor.clone())
        .run(&ExecutionContext::new(), false, true)
        .await
        .unwrap();

    assert_eq!(result.npcs_spawned, 2);
    assert_eq!(result.agents_skipped, 0);
    let mentor_2 = store.get_agent("mentor-2").await.unwrap().id;
    let mentor_3 = store.get_agent("mentor-3").await.unwrap().id;
    assert_eq!(
        *executor.mentors.lock().unwrap(),
        vec![Some(mentor_2), Some(mentor_3)]
    );
    assert_eq!(store.get_agent("mentor-1").await.unwrap().status, AgentStatus::Busy);
}

#[tokio::test]
async fn test_trainee_named_mentor_keeps_its_record() {
    let (store, board) = harness();
    let config = ArenaConfig::new(vec![AgentProfile::new("Mentor").with_skills(["analysis"])])
        .with_mentors(2)
        .with_max_training_quests(1);

    let result = arena(&store, &board, config)
        .run(&ExecutionContext::new(), false, true)
        .await
        .unwrap();

    assert_eq!(result.npcs_spawned, 2);
    let trainee = store.get_agent("mentor-1").await.unwrap();
    assert!(!trainee.is_npc);
    assert!(!trainee.has_skill(TRAINING_SKILL));
    assert!(store.get_agent("mentor-2").await.unwrap().is_npc);
    assert!(store.get_agent("mentor-3").await.unwrap().is_npc);
}

#[tokio::test]
async fn test_mentor_spawn_failure_is_not_fatal() {
    let (store, board) = harness();
    store.set_failing_reads(true);
    let config = ArenaConfig::new(scouts(1))
        .with_mentors(1)
        .with_max_training_quests(1);

    // Idempotent lookups read the store, so bootstrap without them.
    let result = arena(&store, &board, config)
        .run(&ExecutionContext::new(), false, false)
        .await
        .unwrap();

    assert!(result.success);
    assert!(result.errors.iter().any(|e| e.contains("Mentor")));
    assert_eq!(result.npcs_spawned, 0);
}

#[tokio::test]
async fn test_cancellation_returns_partial() {
    let (store, board) = harness();
    let ctx = ExecutionContext::new();
    let config = ArenaConfig::new(scouts(1)).with_max_training_quests(10);

    let failure = arena(&store, &board, config)
        .with_executor(Arc::new(CancellingExecutor { ctx: ctx.clone() }))
        .run(&ctx, false, true)
        .await
        .unwrap_err();

    assert!(matches!(failure.error, SeedError::Cancelled(_)));
    assert!(!failure.partial.success);
    assert_eq!(failure.partial.quests_run, 1);
    assert_eq!(failure.partial.quests_completed, 1);
    assert_eq!(failure.partial.agents.len(), 1);
}

#[tokio::test]
async fn test_concurrent_rounds_reach_targets() {
    let (store, board) = harness();
    let mut config = ArenaConfig::new(scouts(4))
        .with_target_levels(LevelDistribution::uniform(2))
        .with_max_training_quests(20);
    config.round_concurrency = 4;

    let result = arena(&store, &board, config)
        .run(&ExecutionContext::new(), false, true)
        .await
        .unwrap();

    assert_eq!(result.quests_run, 20);
    assert!(result.agents.iter().all(|a| a.level == 2));
    assert_eq!(board.submission_count(), 20);
}

#[tokio::test]
async fn test_training_progress_events() {
    let (store, board) = harness();
    let progress = Arc::new(BroadcastProgress::new(64));
    let mut rx = progress.subscribe();
    let config = ArenaConfig::new(scouts(1)).with_max_training_quests(2);

    arena(&store, &board, config)
        .with_progress(progress.clone())
        .run(&ExecutionContext::new(), false, true)
        .await
        .unwrap();

    let mut training = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if event.phase == ProgressPhase::Training {
            training.push(event);
        }
    }
    assert_eq!(training.len(), 2);
    assert_eq!(training[1].current, 2);
    assert_eq!(training[1].total, 2);
    assert_eq!(training[1].agent_name.as_deref(), Some("scout-1"));
}
