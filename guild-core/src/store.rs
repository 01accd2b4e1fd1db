//! Persistent agent and guild store port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{Agent, AgentId, Guild, GuildId};

/// Error types for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Write rejected
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Backend failure
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Id construction rules for a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Prefix shared by every entity id in this store
    pub namespace: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: "guildhall".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Entity id for an agent instance.
    pub fn agent_entity_id(&self, instance: &str) -> AgentId {
        AgentId(format!("{}.agent.{}", self.namespace, instance))
    }
}

/// Derive a store instance key from an agent name: lowercase ASCII
/// alphanumerics, every other run of characters collapsed to `-`.
pub fn instance_for(name: &str) -> String {
    let mut instance = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !instance.is_empty() {
                instance.push('-');
            }
            pending_dash = false;
            instance.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    instance
}

/// Agent and guild persistence.
#[async_trait]
pub trait Store: Send + Sync {
    /// Id construction rules.
    fn config(&self) -> &StoreConfig;

    /// Create or replace an agent under its instance key.
    async fn put_agent(&self, instance: &str, agent: Agent) -> Result<(), StoreError>;

    /// Read an agent by instance key.
    async fn get_agent(&self, instance: &str) -> Result<Agent, StoreError>;

    /// Every stored agent, in a stable order.
    async fn list_all_agents(&self) -> Result<Vec<Agent>, StoreError>;

    /// Create or replace a guild.
    async fn put_guild(&self, id: &GuildId, guild: Guild) -> Result<(), StoreError>;

    /// Read a guild.
    async fn get_guild(&self, id: &GuildId) -> Result<Guild, StoreError>;

    /// Atomic read-modify-write of a guild. The mutator may be invoked more
    /// than once by optimistic implementations.
    async fn update_guild(
        &self,
        id: &GuildId,
        mutator: &(dyn for<'g> Fn(&'g mut Guild) + Send + Sync),
    ) -> Result<(), StoreError>;

    /// Find an agent by exact name.
    async fn find_agent_by_name(&self, name: &str) -> Result<Option<Agent>, StoreError> {
        let agents = self.list_all_agents().await?;
        Ok(agents.into_iter().find(|a| a.name == name))
    }

    /// Read an agent by its entity id.
    async fn get_agent_by_id(&self, id: &AgentId) -> Result<Agent, StoreError> {
        let agents = self.list_all_agents().await?;
        agents
            .into_iter()
            .find(|a| &a.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}
