//! Agent entity - prompt + model configuration owned by a user

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::storage::StorageEntity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    id: String,
    user_id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    model: String,
    system_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Fields a caller may set when creating or editing an agent
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
}

impl Agent {
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            name: name.into(),
            description: None,
            model: model.into(),
            system_prompt: system_prompt.into(),
            temperature: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Apply every field present in `changes`
    pub fn apply(&mut self, changes: AgentChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(description) = changes.description {
            self.description = Some(description);
        }
        if let Some(model) = changes.model {
            self.model = model;
        }
        if let Some(system_prompt) = changes.system_prompt {
            self.system_prompt = system_prompt;
        }
        if let Some(temperature) = changes.temperature {
            self.temperature = Some(temperature);
        }
        self.updated_at = Utc::now();
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl StorageEntity for Agent {
    type Key = String;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_only_touches_present_fields() {
        let mut agent = Agent::new("u-1", "Researcher", "gpt-4o", "You research things.");

        agent.apply(AgentChanges {
            name: Some("Analyst".to_string()),
            temperature: Some(0.2),
            ..Default::default()
        });

        assert_eq!(agent.name(), "Analyst");
        assert_eq!(agent.model(), "gpt-4o");
        assert_eq!(agent.temperature(), Some(0.2));
        assert!(agent.is_owned_by("u-1"));
    }

    #[test]
    fn test_serializes_user_id_in_camel_case() {
        let agent = Agent::new("u-1", "Researcher", "gpt-4o", "prompt");
        let json = serde_json::to_value(&agent).unwrap();

        assert_eq!(json["userId"], "u-1");
        assert_eq!(json["systemPrompt"], "prompt");
        assert!(json.get("description").is_none());
    }
}
