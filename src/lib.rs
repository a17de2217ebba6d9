//! Agentflow
//!
//! Agent and workflow server built around an action dispatch framework:
//! each action is declared once and served both as an HTTP route and as a
//! WebSocket RPC, with shared validation, middleware, sessions and a typed
//! error taxonomy.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::actions::{build_registry, ActionServices};
use api::ws::ChannelHub;
use api::{Dispatcher, Server};
use domain::{Agent, SessionStore, User};
use infrastructure::{
    agent::AgentService,
    cache::CacheFactory,
    storage::InMemoryStorage,
    user::{Argon2Hasher, UserService},
};
use tracing::info;

/// Build the server: session store, services, action registry and channel hub
pub async fn create_server(config: &AppConfig) -> anyhow::Result<Server> {
    let cache = CacheFactory::create(&config.session.cache_config()).await?;
    let sessions = Arc::new(SessionStore::new(
        cache,
        config.session.cookie_name.clone(),
        config.session.key_prefix.clone(),
        config.session.ttl(),
    ));

    let users = Arc::new(UserService::new(
        Arc::new(InMemoryStorage::<User>::new()),
        Arc::new(Argon2Hasher),
    ));
    let agents = Arc::new(AgentService::new(Arc::new(InMemoryStorage::<Agent>::new())));
    let hub = Arc::new(ChannelHub::new());

    let registry = build_registry(&ActionServices {
        users,
        agents,
        hub: hub.clone(),
    })?;

    info!(
        actions = registry.len(),
        session_backend = %config.session.backend,
        "Server initialized"
    );

    Ok(Server {
        config: Arc::new(config.clone()),
        registry: Arc::new(registry),
        dispatcher: Arc::new(Dispatcher::new(config.is_production())),
        sessions,
        hub,
    })
}
