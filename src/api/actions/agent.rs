//! Agent CRUD for the signed-in user.
//!
//! An agent that does not exist and an agent owned by someone else fail the
//! same way, so callers cannot probe for other users' ids.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::action::{Action, NoParams, WebBinding};
use crate::api::connection::Connection;
use crate::api::middleware::{session_user_id, Middleware};
use crate::domain::action::{Field, Schema};
use crate::domain::agent::AgentChanges;
use crate::domain::TypedError;
use crate::infrastructure::agent::AgentService;

use super::signed_in;

const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Debug, Deserialize)]
pub struct AgentIdParams {
    id: String,
}

#[derive(Debug, Deserialize)]
pub struct AgentEditParams {
    id: String,
    #[serde(flatten)]
    changes: AgentChanges,
}

fn id_field() -> Field {
    Field::string("id").min_length(1)
}

fn temperature_field() -> Field {
    Field::number("temperature")
        .optional()
        .min(0.0)
        .max(2.0)
        .message("temperature must be a number between 0 and 2")
}

#[derive(Debug)]
pub struct AgentCreate {
    agents: Arc<AgentService>,
}

impl AgentCreate {
    pub fn new(agents: Arc<AgentService>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl Action for AgentCreate {
    type Params = AgentChanges;

    fn name(&self) -> &'static str {
        "agent:create"
    }

    fn description(&self) -> &'static str {
        "Create an agent"
    }

    fn web_binding(&self) -> Option<WebBinding> {
        Some(WebBinding::put("/agent"))
    }

    fn middleware(&self) -> Vec<Arc<dyn Middleware>> {
        signed_in()
    }

    fn input_schema(&self) -> Option<Schema> {
        Some(
            Schema::new()
                .field(Field::string("name").min_length(1).max_length(256))
                .field(Field::string("description").optional().max_length(4096))
                .field(Field::string("model").default_value(DEFAULT_MODEL).min_length(1))
                .field(Field::string("systemPrompt").min_length(1))
                .field(temperature_field()),
        )
    }

    async fn run(
        &self,
        params: AgentChanges,
        connection: &mut Connection,
    ) -> Result<Value, TypedError> {
        let user_id = session_user_id(connection)?;
        let agent = self.agents.create(&user_id, params).await?;

        Ok(json!({ "agent": agent }))
    }
}

#[derive(Debug)]
pub struct AgentList {
    agents: Arc<AgentService>,
}

impl AgentList {
    pub fn new(agents: Arc<AgentService>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl Action for AgentList {
    type Params = NoParams;

    fn name(&self) -> &'static str {
        "agent:list"
    }

    fn description(&self) -> &'static str {
        "List the signed-in user's agents"
    }

    fn web_binding(&self) -> Option<WebBinding> {
        Some(WebBinding::get("/agents"))
    }

    fn middleware(&self) -> Vec<Arc<dyn Middleware>> {
        signed_in()
    }

    async fn run(&self, _params: NoParams, connection: &mut Connection) -> Result<Value, TypedError> {
        let user_id = session_user_id(connection)?;
        let agents = self.agents.list_for(&user_id).await?;

        Ok(json!({ "agents": agents }))
    }
}

#[derive(Debug)]
pub struct AgentView {
    agents: Arc<AgentService>,
}

impl AgentView {
    pub fn new(agents: Arc<AgentService>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl Action for AgentView {
    type Params = AgentIdParams;

    fn name(&self) -> &'static str {
        "agent:view"
    }

    fn web_binding(&self) -> Option<WebBinding> {
        Some(WebBinding::get("/agent/:id"))
    }

    fn middleware(&self) -> Vec<Arc<dyn Middleware>> {
        signed_in()
    }

    fn input_schema(&self) -> Option<Schema> {
        Some(Schema::new().field(id_field()))
    }

    async fn run(
        &self,
        params: AgentIdParams,
        connection: &mut Connection,
    ) -> Result<Value, TypedError> {
        let user_id = session_user_id(connection)?;
        let agent = self.agents.get_owned(&user_id, &params.id).await?;

        Ok(json!({ "agent": agent }))
    }
}

#[derive(Debug)]
pub struct AgentEdit {
    agents: Arc<AgentService>,
}

impl AgentEdit {
    pub fn new(agents: Arc<AgentService>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl Action for AgentEdit {
    type Params = AgentEditParams;

    fn name(&self) -> &'static str {
        "agent:edit"
    }

    fn web_binding(&self) -> Option<WebBinding> {
        Some(WebBinding::post("/agent/:id"))
    }

    fn middleware(&self) -> Vec<Arc<dyn Middleware>> {
        signed_in()
    }

    fn input_schema(&self) -> Option<Schema> {
        Some(
            Schema::new()
                .field(id_field())
                .field(Field::string("name").optional().min_length(1).max_length(256))
                .field(Field::string("description").optional().max_length(4096))
                .field(Field::string("model").optional().min_length(1))
                .field(Field::string("systemPrompt").optional().min_length(1))
                .field(temperature_field()),
        )
    }

    async fn run(
        &self,
        params: AgentEditParams,
        connection: &mut Connection,
    ) -> Result<Value, TypedError> {
        let user_id = session_user_id(connection)?;
        let agent = self
            .agents
            .update(&user_id, &params.id, params.changes)
            .await?;

        Ok(json!({ "agent": agent }))
    }
}

#[derive(Debug)]
pub struct AgentDelete {
    agents: Arc<AgentService>,
}

impl AgentDelete {
    pub fn new(agents: Arc<AgentService>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl Action for AgentDelete {
    type Params = AgentIdParams;

    fn name(&self) -> &'static str {
        "agent:delete"
    }

    fn web_binding(&self) -> Option<WebBinding> {
        Some(WebBinding::delete("/agent/:id"))
    }

    fn middleware(&self) -> Vec<Arc<dyn Middleware>> {
        signed_in()
    }

    fn input_schema(&self) -> Option<Schema> {
        Some(Schema::new().field(id_field()))
    }

    async fn run(
        &self,
        params: AgentIdParams,
        connection: &mut Connection,
    ) -> Result<Value, TypedError> {
        let user_id = session_user_id(connection)?;
        self.agents.delete(&user_id, &params.id).await?;

        Ok(json!({ "success": true }))
    }
}
