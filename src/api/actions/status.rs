//! Server status

use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::api::action::{Action, NoParams, WebBinding};
use crate::api::connection::Connection;
use crate::domain::TypedError;

/// Liveness and version of the running server
#[derive(Debug)]
pub struct Status {
    started_at: Instant,
}

impl Status {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Action for Status {
    type Params = NoParams;

    fn name(&self) -> &'static str {
        "status"
    }

    fn description(&self) -> &'static str {
        "Server name, version and uptime"
    }

    fn web_binding(&self) -> Option<WebBinding> {
        Some(WebBinding::get("/status"))
    }

    async fn run(&self, _params: NoParams, _connection: &mut Connection) -> Result<Value, TypedError> {
        Ok(json!({
            "status": "ok",
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "uptimeMs": self.started_at.elapsed().as_millis() as u64,
        }))
    }
}
