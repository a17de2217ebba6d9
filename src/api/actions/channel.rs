//! Broadcast to a WebSocket channel from any transport

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::action::{Action, WebBinding};
use crate::api::connection::Connection;
use crate::api::middleware::Middleware;
use crate::api::ws::ChannelHub;
use crate::domain::action::{Field, Schema};
use crate::domain::TypedError;

use super::signed_in;

#[derive(Debug, Deserialize)]
pub struct ChannelBroadcastParams {
    channel: String,
    message: Value,
}

/// Push a message to every socket subscribed to a channel
#[derive(Debug)]
pub struct ChannelBroadcast {
    hub: Arc<ChannelHub>,
}

impl ChannelBroadcast {
    pub fn new(hub: Arc<ChannelHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl Action for ChannelBroadcast {
    type Params = ChannelBroadcastParams;

    fn name(&self) -> &'static str {
        "channel:broadcast"
    }

    fn web_binding(&self) -> Option<WebBinding> {
        Some(WebBinding::post("/channel/:channel"))
    }

    fn middleware(&self) -> Vec<Arc<dyn Middleware>> {
        signed_in()
    }

    fn input_schema(&self) -> Option<Schema> {
        Some(
            Schema::new()
                .field(Field::string("channel").min_length(1).max_length(256))
                .field(Field::object("message")),
        )
    }

    async fn run(
        &self,
        params: ChannelBroadcastParams,
        _connection: &mut Connection,
    ) -> Result<Value, TypedError> {
        let delivered = self.hub.broadcast(&params.channel, params.message).await;

        Ok(json!({ "channel": params.channel, "delivered": delivered }))
    }
}
