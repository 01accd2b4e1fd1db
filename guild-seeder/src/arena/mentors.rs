//! Mentor discovery, bootstrap roster and assignment.

use std::collections::BTreeSet;

use guild_core::{instance_for, Agent, AgentId, Store, Tier, TRAINING_SKILL};

use crate::config::{RosterAgentSpec, RosterConfig};
use crate::error::MentorBootstrapError;

/// Level bootstrapped mentors start at (Journeyman).
pub const MENTOR_LEVEL: u8 = 8;

pub const MENTORING_SKILL: &str = "mentoring";

pub const MENTOR_NAME_PATTERN: &str = "mentor-{n}";

const MENTOR_PREFIX: &str = "mentor-";

/// Idle agents with the training skill at Journeyman or above.
pub fn is_qualified_mentor(agent: &Agent) -> bool {
    agent.has_skill(TRAINING_SKILL) && agent.tier >= Tier::Journeyman && agent.is_idle()
}

/// Qualified mentors in store order, trainees excluded.
pub async fn find_mentors(
    store: &dyn Store,
    trainees: &BTreeSet<AgentId>,
) -> Result<Vec<Agent>, MentorBootstrapError> {
    let agents = store.list_all_agents().await?;
    Ok(agents
        .into_iter()
        .filter(|agent| !trainees.contains(&agent.id) && is_qualified_mentor(agent))
        .collect())
}

/// First mentor ordinal no taken name already uses. Names compare by
/// their store instance key.
pub fn next_mentor_ordinal<'a>(taken: impl IntoIterator<Item = &'a str>) -> u32 {
    taken
        .into_iter()
        .filter_map(|name| {
            instance_for(name)
                .strip_prefix(MENTOR_PREFIX)
                .and_then(|n| n.parse::<u32>().ok())
        })
        .max()
        .map_or(1, |n| n.saturating_add(1))
}

/// Roster that spawns `count` NPC mentors numbered from `first_ordinal`.
pub fn mentor_roster(count: u32, first_ordinal: u32) -> RosterConfig {
    RosterConfig::new("arena-mentors").with_agents(
        RosterAgentSpec::new(MENTOR_NAME_PATTERN, count, MENTOR_LEVEL)
            .with_skills([TRAINING_SKILL, MENTORING_SKILL])
            .with_npc(true)
            .starting_at(first_ordinal),
    )
}

/// Round-robin assignment in trainee order. Each mentor takes at most
/// `per_mentor` trainees; the rest go unmentored.
pub fn assign_mentors(trainees: usize, mentors: &[AgentId], per_mentor: u32) -> Vec<Option<AgentId>> {
    let capacity = mentors.len() * per_mentor as usize;
    (0..trainees)
        .map(|i| (i < capacity).then(|| mentors[i % mentors.len()].clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use guild_core::memory::InMemoryStore;
    use guild_core::AgentStatus;

    fn agent(name: &str, level: u8, skills: &[&str]) -> Agent {
        Agent::new(AgentId::new(format!("ns.agent.{name}")), name, level)
            .with_skills(skills.iter().copied())
    }

    #[test]
    fn test_qualification() {
        assert!(is_qualified_mentor(&agent("a", 6, &["training"])));
        assert!(!is_qualified_mentor(&agent("b", 5, &["training"])));
        assert!(!is_qualified_mentor(&agent("c", 12, &["analysis"])));

        let mut busy = agent("d", 12, &["training"]);
        busy.status = AgentStatus::Busy;
        assert!(!is_qualified_mentor(&busy));
    }

    #[tokio::test]
    async fn test_find_excludes_trainees() {
        let store = InMemoryStore::new();
        let senior = agent("senior", 10, &["training"]);
        let trainee = agent("trainee", 10, &["training"]);
        store.put_agent("senior", senior.clone()).await.unwrap();
        store.put_agent("trainee", trainee.clone()).await.unwrap();

        let exclude = BTreeSet::from([trainee.id.clone()]);
        let mentors = find_mentors(&store, &exclude).await.unwrap();
        assert_eq!(mentors.len(), 1);
        assert_eq!(mentors[0].id, senior.id);
    }

    #[test]
    fn test_mentor_roster_shape() {
        let roster = mentor_roster(2, 1);
        assert!(roster.validate().is_ok());
        assert_eq!(
            roster.agents[0].expand_names(),
            vec!["mentor-1", "mentor-2"]
        );
        assert!(roster.agents[0].is_npc);
    }

    #[test]
    fn test_next_mentor_ordinal_skips_taken_names() {
        assert_eq!(next_mentor_ordinal(std::iter::empty()), 1);
        assert_eq!(next_mentor_ordinal(["scout-1", "mentors-4"]), 1);
        assert_eq!(next_mentor_ordinal(["mentor-1", "Mentor 3", "mentor-x"]), 4);
    }

    #[test]
    fn test_assignment_caps_per_mentor() {
        let mentors = vec![AgentId::new("m1"), AgentId::new("m2")];
        let assigned = assign_mentors(5, &mentors, 2);
        assert_eq!(
            assigned,
            vec![
                Some(AgentId::new("m1")),
                Some(AgentId::new("m2")),
                Some(AgentId::new("m1")),
                Some(AgentId::new("m2")),
                None,
            ]
        );
        assert!(assign_mentors(3, &[], 2).iter().all(Option::is_none));
    }
}
