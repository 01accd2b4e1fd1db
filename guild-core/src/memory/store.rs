//! In-memory store for tests and local runs.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::store::{Store, StoreConfig, StoreError};
use crate::types::{Agent, Guild, GuildId};

/// Simple in-memory store.
///
/// Agents list in creation order. Guild updates hold the map entry lock for
/// the duration of the mutator, which makes `update_guild` atomic.
pub struct InMemoryStore {
    config: StoreConfig,
    agents: RwLock<AgentTable>,
    guilds: DashMap<GuildId, Guild>,
    fail_agent_writes: AtomicBool,
    fail_reads: AtomicBool,
}

#[derive(Default)]
struct AgentTable {
    by_instance: HashMap<String, Agent>,
    /// Instance keys in first-insertion order
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            agents: RwLock::new(AgentTable::default()),
            guilds: DashMap::new(),
            fail_agent_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `put_agent` fail.
    pub fn with_failing_agent_writes(self, failing: bool) -> Self {
        self.set_failing_agent_writes(failing);
        self
    }

    pub fn set_failing_agent_writes(&self, failing: bool) {
        self.fail_agent_writes.store(failing, Ordering::SeqCst);
    }

    /// Make every subsequent agent read fail.
    pub fn set_failing_reads(&self, failing: bool) {
        self.fail_reads.store(failing, Ordering::SeqCst);
    }

    pub async fn agent_count(&self) -> usize {
        self.agents.read().await.by_instance.len()
    }

    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("reads disabled".to_string()));
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    fn config(&self) -> &StoreConfig {
        &self.config
    }

    async fn put_agent(&self, instance: &str, agent: Agent) -> Result<(), StoreError> {
        if self.fail_agent_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed(format!(
                "agent writes disabled ({instance})"
            )));
        }

        let mut table = self.agents.write().await;
        if !table.by_instance.contains_key(instance) {
            let seq = table.next_seq;
            table.next_seq += 1;
            table.order.insert(seq, instance.to_string());
        }
        table.by_instance.insert(instance.to_string(), agent);
        Ok(())
    }

    async fn get_agent(&self, instance: &str) -> Result<Agent, StoreError> {
        self.check_reads()?;
        self.agents
            .read()
            .await
            .by_instance
            .get(instance)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("agent {instance}")))
    }

    async fn list_all_agents(&self) -> Result<Vec<Agent>, StoreError> {
        self.check_reads()?;
        let table = self.agents.read().await;
        Ok(table
            .order
            .values()
            .filter_map(|instance| table.by_instance.get(instance).cloned())
            .collect())
    }

    async fn put_guild(&self, id: &GuildId, guild: Guild) -> Result<(), StoreError> {
        self.guilds.insert(id.clone(), guild);
        Ok(())
    }

    async fn get_guild(&self, id: &GuildId) -> Result<Guild, StoreError> {
        self.guilds
            .get(id)
            .map(|g| g.value().clone())
            .ok_or_else(|| StoreError::NotFound(format!("guild {id}")))
    }

    async fn update_guild(
        &self,
        id: &GuildId,
        mutator: &(dyn for<'g> Fn(&'g mut Guild) + Send + Sync),
    ) -> Result<(), StoreError> {
        let mut entry = self
            .guilds
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("guild {id}")))?;
        mutator(entry.value_mut());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AgentId;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_agents_list_in_insertion_order() {
        let store = InMemoryStore::new();
        for name in ["zeta", "alpha", "mid"] {
            let id = store.config().agent_entity_id(name);
            store.put_agent(name, Agent::new(id, name, 1)).await.unwrap();
        }

        // Overwrite keeps the original slot
        let id = store.config().agent_entity_id("zeta");
        store.put_agent("zeta", Agent::new(id, "zeta", 3)).await.unwrap();

        let names: Vec<_> = store
            .list_all_agents()
            .await
            .unwrap()
            .into_iter()
            .map(|a| (a.name, a.level))
            .collect();
        assert_eq!(
            names,
            vec![("zeta".into(), 3), ("alpha".into(), 1), ("mid".into(), 1)]
        );
    }

    #[tokio::test]
    async fn test_find_by_name_and_missing() {
        let store = InMemoryStore::new();
        let id = store.config().agent_entity_id("scout");
        store.put_agent("scout", Agent::new(id.clone(), "scout", 2)).await.unwrap();

        let found = store.find_agent_by_name("scout").await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(id.clone()));
        assert!(store.find_agent_by_name("nobody").await.unwrap().is_none());
        assert!(store.get_agent("nobody").await.unwrap_err().is_not_found());
        assert_eq!(store.get_agent_by_id(&id).await.unwrap().name, "scout");
    }

    #[tokio::test]
    async fn test_concurrent_guild_updates_keep_every_member() {
        let store = Arc::new(InMemoryStore::new());
        let guild_id = GuildId::new("rangers");
        store
            .put_guild(&guild_id, Guild::found(guild_id.clone(), "Rangers", "", "", 1))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            let guild_id = guild_id.clone();
            handles.push(tokio::spawn(async move {
                let member = AgentId::new(format!("agent-{i}"));
                store
                    .update_guild(&guild_id, &move |g: &mut Guild| {
                        g.add_member(member.clone());
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get_guild(&guild_id).await.unwrap().members.len(), 16);
    }

    #[tokio::test]
    async fn test_failing_writes() {
        let store = InMemoryStore::new().with_failing_agent_writes(true);
        let id = store.config().agent_entity_id("x");
        let err = store.put_agent("x", Agent::new(id, "x", 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::WriteFailed(_)));
        tokio_test::assert_ok!(store.list_all_agents().await);
    }
}
