//! Server state shared by every handler

use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::warn;

use crate::config::AppConfig;
use crate::domain::{SessionData, SessionStore};

use super::cookie;
use super::dispatcher::Dispatcher;
use super::registry::ActionRegistry;
use super::ws::ChannelHub;

/// Everything a request needs, built once at startup and cloned per request
#[derive(Clone)]
pub struct Server {
    pub config: Arc<AppConfig>,
    pub registry: Arc<ActionRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub sessions: Arc<SessionStore>,
    pub hub: Arc<ChannelHub>,
}

impl Server {
    /// Session named by the request's session cookie, if it is still live
    pub async fn session_from_headers(&self, headers: &HeaderMap) -> Option<SessionData> {
        let id = cookie::read(headers, self.sessions.cookie_name())?;

        match self.sessions.get(&id).await {
            Ok(session) => session,
            Err(e) => {
                warn!("Session lookup failed: {}", e);
                None
            }
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("actions", &self.registry.len())
            .field("cookie_name", &self.sessions.cookie_name())
            .finish()
    }
}
