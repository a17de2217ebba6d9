//! Pre-handlers run by the dispatcher before an action body

mod session;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::api::connection::Connection;
use crate::domain::TypedError;

pub use session::{session_user_id, RequireSession, SESSION_USER_KEY};

/// Runs before an action's `run`; an error short-circuits the invocation
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str;

    /// May read or replace the connection's session
    async fn before(&self, connection: &mut Connection) -> Result<(), TypedError>;
}
