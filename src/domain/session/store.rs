//! Session store on top of a TTL cache

use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use serde_json::Value;
use tracing::debug;

use crate::domain::cache::{Cache, CacheExt};
use crate::domain::DomainError;

use super::entity::SessionData;

const SESSION_ID_BYTES: usize = 32;

/// Maps opaque session ids to [`SessionData`] with a sliding TTL.
///
/// Every write refreshes the TTL; reads do not.
#[derive(Debug, Clone)]
pub struct SessionStore {
    cache: Arc<dyn Cache>,
    cookie_name: String,
    key_prefix: String,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(
        cache: Arc<dyn Cache>,
        cookie_name: impl Into<String>,
        key_prefix: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            cache,
            cookie_name: cookie_name.into(),
            key_prefix: key_prefix.into(),
            ttl,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(&self, id: &str) -> String {
        format!("{}:{}", self.key_prefix, id)
    }

    fn generate_id() -> String {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Create a new session holding `data`
    pub async fn create(&self, data: Value) -> Result<SessionData, DomainError> {
        let session = SessionData::new(Self::generate_id(), &self.cookie_name, data);
        self.cache.set(&self.key(session.id()), &session, self.ttl).await?;

        debug!(session_id = %session.id(), "Session created");
        Ok(session)
    }

    /// Look up a live session; expired and unknown ids both yield `None`
    pub async fn get(&self, id: &str) -> Result<Option<SessionData>, DomainError> {
        if id.is_empty() {
            return Ok(None);
        }

        self.cache.get(&self.key(id)).await
    }

    /// Replace the data of an existing session
    pub async fn update(&self, id: &str, data: Value) -> Result<SessionData, DomainError> {
        let mut session = self
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Session not found"))?;

        session.replace_data(data);
        self.save(&session).await?;
        Ok(session)
    }

    /// Persist a session as-is, refreshing its TTL
    pub async fn save(&self, session: &SessionData) -> Result<(), DomainError> {
        self.cache.set(&self.key(session.id()), session, self.ttl).await
    }

    /// Remove a session, returning whether it existed
    pub async fn destroy(&self, id: &str) -> Result<bool, DomainError> {
        let existed = self.cache.delete(&self.key(id)).await?;

        debug!(session_id = %id, existed, "Session destroyed");
        Ok(existed)
    }

    /// Backend reachability, for readiness checks
    pub async fn ping(&self) -> Result<(), DomainError> {
        self.cache.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use serde_json::json;

    fn store(cache: Arc<MockCache>) -> SessionStore {
        SessionStore::new(cache, "agentflow_session", "session", Duration::from_secs(600))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let cache = Arc::new(MockCache::new());
        let sessions = store(cache.clone());

        let created = sessions.create(json!({"userId": "u-1"})).await.unwrap();

        assert_eq!(created.id().len(), SESSION_ID_BYTES * 2);
        assert_eq!(created.cookie_name(), "agentflow_session");
        assert_eq!(cache.keys(), vec![format!("session:{}", created.id())]);
        assert_eq!(
            cache.ttl_of(&format!("session:{}", created.id())),
            Some(Duration::from_secs(600))
        );

        let fetched = sessions.get(created.id()).await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let sessions = store(Arc::new(MockCache::new()));

        let a = sessions.create(json!({})).await.unwrap();
        let b = sessions.create(json!({})).await.unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_update_preserves_id() {
        let sessions = store(Arc::new(MockCache::new()));
        let created = sessions.create(json!({"step": 1})).await.unwrap();

        let updated = sessions.update(created.id(), json!({"step": 2})).await.unwrap();

        assert_eq!(updated.id(), created.id());
        assert_eq!(updated.created_at(), created.created_at());
        assert_eq!(updated.data(), &json!({"step": 2}));
    }

    #[tokio::test]
    async fn test_update_missing_session() {
        let sessions = store(Arc::new(MockCache::new()));

        let err = sessions.update("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_destroy() {
        let sessions = store(Arc::new(MockCache::new()));
        let created = sessions.create(json!({})).await.unwrap();

        assert!(sessions.destroy(created.id()).await.unwrap());
        assert!(!sessions.destroy(created.id()).await.unwrap());
        assert!(sessions.get(created.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_id_is_missing() {
        let sessions = store(Arc::new(MockCache::new()));
        assert!(sessions.get("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_backend_errors_propagate() {
        let sessions = store(Arc::new(MockCache::new().with_error("connection refused")));

        let err = sessions.get("abc").await.unwrap_err();
        assert!(matches!(err, DomainError::Cache { .. }));
    }
}
