//! Transport-neutral view of one caller

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::domain::{DomainError, SessionData, SessionStore, TypedError};

/// How a request reached the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Http,
    WebSocket,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::WebSocket => write!(f, "websocket"),
        }
    }
}

/// Session mutation made while an action ran, applied by the transport afterwards
#[derive(Debug, Clone, PartialEq)]
pub enum SessionChange {
    Set(SessionData),
    Cleared,
}

/// One caller: an HTTP request, or one frame on a WebSocket.
///
/// Carries the raw input, the resolved session and the session store so
/// actions can sign callers in and out without knowing the transport.
#[derive(Debug)]
pub struct Connection {
    id: String,
    transport: Transport,
    raw_params: Map<String, Value>,
    session: Option<SessionData>,
    message_id: Option<String>,
    sessions: Arc<SessionStore>,
    session_change: Option<SessionChange>,
}

impl Connection {
    pub fn new(
        id: impl Into<String>,
        transport: Transport,
        raw_params: Map<String, Value>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            id: id.into(),
            transport,
            raw_params,
            session: None,
            message_id: None,
            sessions,
            session_change: None,
        }
    }

    pub fn with_session(mut self, session: Option<SessionData>) -> Self {
        self.session = session;
        self
    }

    pub fn with_message_id(mut self, message_id: Option<String>) -> Self {
        self.message_id = message_id;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn raw_params(&self) -> &Map<String, Value> {
        &self.raw_params
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn session(&self) -> Option<&SessionData> {
        self.session.as_ref()
    }

    pub fn require_session(&self) -> Result<&SessionData, TypedError> {
        self.session.as_ref().ok_or_else(TypedError::session_not_found)
    }

    pub fn session_change(&self) -> Option<&SessionChange> {
        self.session_change.as_ref()
    }

    /// Store `data` as this caller's session, creating the session if needed
    pub async fn update_session(&mut self, data: Value) -> Result<&SessionData, TypedError> {
        let session = match &self.session {
            Some(current) => match self.sessions.update(current.id(), data.clone()).await {
                Ok(session) => session,
                Err(DomainError::NotFound { .. }) => self.sessions.create(data).await?,
                Err(e) => return Err(e.into()),
            },
            None => self.sessions.create(data).await?,
        };

        self.session_change = Some(SessionChange::Set(session.clone()));
        Ok(self.session.insert(session))
    }

    /// Delete this caller's session; returns whether one was stored.
    ///
    /// A store failure leaves the session and the cookie in place.
    pub async fn destroy_session(&mut self) -> Result<bool, TypedError> {
        let existed = match &self.session {
            Some(session) => self.sessions.destroy(session.id()).await?,
            None => false,
        };

        self.session = None;
        self.session_change = Some(SessionChange::Cleared);
        Ok(existed)
    }
}
