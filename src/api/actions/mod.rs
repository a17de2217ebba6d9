//! Actions served over HTTP and WebSocket

mod agent;
mod channel;
mod session;
mod status;
mod user;

use std::sync::Arc;

use crate::infrastructure::agent::AgentService;
use crate::infrastructure::user::UserService;

use super::middleware::{Middleware, RequireSession};
use super::registry::{ActionRegistry, RegistryError};
use super::ws::ChannelHub;

pub use agent::{AgentCreate, AgentDelete, AgentEdit, AgentList, AgentView};
pub use channel::ChannelBroadcast;
pub use session::{SessionCreate, SessionDestroy};
pub use status::Status;
pub use user::{UserCreate, UserView};

/// Collaborators the actions are built from
#[derive(Debug, Clone)]
pub struct ActionServices {
    pub users: Arc<UserService>,
    pub agents: Arc<AgentService>,
    pub hub: Arc<ChannelHub>,
}

/// Registry holding every action
pub fn build_registry(services: &ActionServices) -> Result<ActionRegistry, RegistryError> {
    let mut registry = ActionRegistry::new();

    registry.register(Status::new())?;

    registry.register(UserCreate::new(services.users.clone()))?;
    registry.register(UserView::new(services.users.clone()))?;

    registry.register(SessionCreate::new(services.users.clone()))?;
    registry.register(SessionDestroy)?;

    registry.register(AgentCreate::new(services.agents.clone()))?;
    registry.register(AgentList::new(services.agents.clone()))?;
    registry.register(AgentView::new(services.agents.clone()))?;
    registry.register(AgentEdit::new(services.agents.clone()))?;
    registry.register(AgentDelete::new(services.agents.clone()))?;

    registry.register(ChannelBroadcast::new(services.hub.clone()))?;

    Ok(registry)
}

fn signed_in() -> Vec<Arc<dyn Middleware>> {
    let session: Arc<dyn Middleware> = Arc::new(RequireSession);
    vec![session]
}
