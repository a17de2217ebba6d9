//! Session-requiring middleware

use async_trait::async_trait;
use serde::Deserialize;

use crate::api::connection::Connection;
use crate::domain::TypedError;

use super::Middleware;

/// Key under which sign-in stores the user id in session data
pub const SESSION_USER_KEY: &str = "userId";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignedIn {
    user_id: String,
}

/// Id of the signed-in user, or `SESSION_NOT_FOUND`
pub fn session_user_id(connection: &Connection) -> Result<String, TypedError> {
    let session = connection.require_session()?;

    session
        .data_as::<SignedIn>()
        .map(|signed_in| signed_in.user_id)
        .map_err(|_| TypedError::session_not_found())
}

/// Rejects callers without a signed-in session
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireSession;

#[async_trait]
impl Middleware for RequireSession {
    fn name(&self) -> &'static str {
        "session"
    }

    async fn before(&self, connection: &mut Connection) -> Result<(), TypedError> {
        session_user_id(connection).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::connection::test_support::{connection, session_store};
    use crate::domain::{ErrorKind, SessionData};
    use serde_json::json;

    #[tokio::test]
    async fn test_rejects_missing_session() {
        let mut conn = connection(json!({}), session_store());

        let err = RequireSession.before(&mut conn).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionNotFound);
        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_rejects_session_without_user() {
        let session = SessionData::new("s-1", "agentflow_session", json!({"theme": "dark"}));
        let mut conn = connection(json!({}), session_store()).with_session(Some(session));

        let err = RequireSession.before(&mut conn).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SessionNotFound);
    }

    #[tokio::test]
    async fn test_accepts_signed_in_session() {
        let session = SessionData::new("s-1", "agentflow_session", json!({"userId": "u-1"}));
        let mut conn = connection(json!({}), session_store()).with_session(Some(session));

        RequireSession.before(&mut conn).await.unwrap();
        assert_eq!(session_user_id(&conn).unwrap(), "u-1");
    }
}
