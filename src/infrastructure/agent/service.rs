//! Agent service - per-user agent CRUD

use std::sync::Arc;

use crate::domain::agent::{Agent, AgentChanges};
use crate::domain::storage::Storage;
use crate::domain::DomainError;

#[derive(Debug, Clone)]
pub struct AgentService {
    storage: Arc<dyn Storage<Agent>>,
}

impl AgentService {
    pub fn new(storage: Arc<dyn Storage<Agent>>) -> Self {
        Self { storage }
    }

    pub async fn create(&self, user_id: &str, changes: AgentChanges) -> Result<Agent, DomainError> {
        let name = changes
            .name
            .ok_or_else(|| DomainError::invalid_field("name", "name is required"))?;
        let model = changes
            .model
            .ok_or_else(|| DomainError::invalid_field("model", "model is required"))?;
        let system_prompt = changes
            .system_prompt
            .ok_or_else(|| DomainError::invalid_field("systemPrompt", "systemPrompt is required"))?;

        let agent = Agent::new(user_id, name, model, system_prompt)
            .with_description(changes.description)
            .with_temperature(changes.temperature);

        self.storage.create(agent).await
    }

    /// Agents owned by `user_id`, oldest first
    pub async fn list_for(&self, user_id: &str) -> Result<Vec<Agent>, DomainError> {
        let mut agents: Vec<Agent> = self
            .storage
            .list()
            .await?
            .into_iter()
            .filter(|agent| agent.is_owned_by(user_id))
            .collect();

        agents.sort_by_key(|agent| agent.created_at());
        Ok(agents)
    }

    /// Missing agents and agents owned by someone else produce the same error
    pub async fn get_owned(&self, user_id: &str, id: &str) -> Result<Agent, DomainError> {
        self.storage
            .get(&id.to_string())
            .await?
            .filter(|agent| agent.is_owned_by(user_id))
            .ok_or_else(|| DomainError::not_found(format!("Agent '{}' not found", id)))
    }

    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        changes: AgentChanges,
    ) -> Result<Agent, DomainError> {
        let mut agent = self.get_owned(user_id, id).await?;
        agent.apply(changes);
        self.storage.update(agent).await
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<(), DomainError> {
        let agent = self.get_owned(user_id, id).await?;
        self.storage.delete(&agent.id().to_string()).await?;
        Ok(())
    }
}
