//! Per-socket frame handling

use std::sync::{Arc, PoisonError, RwLock};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::HeaderMap,
    response::Response,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::connection::{Connection, SessionChange, Transport};
use crate::api::cookie;
use crate::api::dispatcher::Reply;
use crate::api::state::Server;
use crate::domain::{SessionData, TypedError};

use super::frame::{InboundFrame, MessageType, OutboundFrame};
use super::hub::FrameSender;

/// `GET /ws` - the session cookie on the upgrade request seeds the socket's session
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(server): State<Server>,
    headers: HeaderMap,
) -> Response {
    let session_id = cookie::read(&headers, server.sessions.cookie_name());
    ws.on_upgrade(move |socket| handle_socket(socket, server, session_id))
}

async fn handle_socket(mut socket: WebSocket, server: Server, session_id: Option<String>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundFrame>();
    let id = Uuid::new_v4().to_string();

    server.hub.connect(&id, tx.clone()).await;
    let client = Arc::new(SocketClient::new(id.clone(), server.clone(), tx, session_id));
    info!(connection_id = %id, "WebSocket connected");

    loop {
        tokio::select! {
            Some(frame) = rx.recv() => {
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(connection_id = %id, "Failed to encode frame: {}", e);
                        continue;
                    }
                };

                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }

            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    let client = client.clone();
                    let text = text.as_str().to_owned();
                    tokio::spawn(async move { client.handle_text(&text).await });
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(connection_id = %id, "WebSocket receive failed: {}", e);
                    break;
                }
            }
        }
    }

    server.hub.disconnect(&id).await;
    info!(connection_id = %id, "WebSocket disconnected");
}

/// State of one socket: its id, outbound queue and adopted session
pub struct SocketClient {
    id: String,
    server: Server,
    outbound: FrameSender,
    session_id: RwLock<Option<String>>,
}

impl SocketClient {
    pub fn new(
        id: impl Into<String>,
        server: Server,
        outbound: FrameSender,
        session_id: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            server,
            outbound,
            session_id: RwLock::new(session_id),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    fn send(&self, frame: OutboundFrame) {
        if self.outbound.send(frame).is_err() {
            debug!(connection_id = %self.id, "Dropping frame for closed socket");
        }
    }

    /// Parse one text frame and answer it on the outbound queue
    pub async fn handle_text(&self, text: &str) {
        let value = match serde_json::from_str::<Value>(text) {
            Ok(value) => value,
            Err(e) => return self.send(OutboundFrame::invalid(format!("JSON Parse error: {}", e))),
        };

        let Some(kind) = MessageType::of(&value) else {
            return self.send(OutboundFrame::invalid(
                "messageType either missing or unknown",
            ));
        };

        let frame = match serde_json::from_value::<InboundFrame>(value) {
            Ok(frame) => frame,
            Err(e) => {
                return self.send(OutboundFrame::invalid(format!("Invalid frame: {}", e)));
            }
        };

        match kind {
            MessageType::Ping => self.send(OutboundFrame::pong(frame.message_id)),
            MessageType::Subscribe => self.subscribe(frame).await,
            MessageType::Unsubscribe => self.unsubscribe(frame).await,
            MessageType::Action => self.run_action(frame).await,
        }
    }

    fn channel_of(&self, frame: &InboundFrame) -> Result<String, TypedError> {
        frame
            .channel
            .clone()
            .filter(|channel| !channel.is_empty())
            .ok_or_else(|| TypedError::param_validation("channel", None, "channel is required"))
    }

    async fn subscribe(&self, frame: InboundFrame) {
        match self.channel_of(&frame) {
            Ok(channel) => {
                self.server.hub.subscribe(&self.id, &channel).await;
                self.send(OutboundFrame::subscribed(frame.message_id, channel));
            }
            Err(error) => self.send(OutboundFrame::error(frame.message_id, error)),
        }
    }

    async fn unsubscribe(&self, frame: InboundFrame) {
        match self.channel_of(&frame) {
            Ok(channel) => {
                self.server.hub.unsubscribe(&self.id, &channel).await;
                self.send(OutboundFrame::unsubscribed(frame.message_id, channel));
            }
            Err(error) => self.send(OutboundFrame::error(frame.message_id, error)),
        }
    }

    async fn run_action(&self, frame: InboundFrame) {
        let Some(message_id) = frame.message_id.clone().filter(|id| !id.is_null()) else {
            return self.send(OutboundFrame::invalid("messageId is required for action frames"));
        };

        let requested = frame.action.clone().unwrap_or_default();
        let action = self.server.registry.get(&requested);

        let mut connection = Connection::new(
            self.id.clone(),
            Transport::WebSocket,
            frame.params.clone().unwrap_or_default(),
            self.server.sessions.clone(),
        )
        .with_session(self.current_session().await)
        .with_message_id(frame.message_id_string());

        let reply = WsReply {
            client: self,
            message_id,
        };

        self.server
            .dispatcher
            .handle(action.as_deref(), &requested, &mut connection, &reply)
            .await;
    }

    async fn current_session(&self) -> Option<SessionData> {
        let id = self
            .session_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;

        match self.server.sessions.get(&id).await {
            Ok(session) => session,
            Err(e) => {
                warn!(connection_id = %self.id, "Session lookup failed: {}", e);
                None
            }
        }
    }

    /// Remember sign-in and sign-out for later frames on this socket
    fn adopt_session(&self, connection: &Connection) {
        let next = match connection.session_change() {
            Some(SessionChange::Set(session)) => Some(session.id().to_string()),
            Some(SessionChange::Cleared) => None,
            None => return,
        };

        *self
            .session_id
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next;
    }
}

struct WsReply<'a> {
    client: &'a SocketClient,
    message_id: Value,
}

impl Reply for WsReply<'_> {
    type Output = ();

    fn respond(&self, connection: &Connection, payload: Value) {
        self.client.adopt_session(connection);
        self.client
            .send(OutboundFrame::response(self.message_id.clone(), payload));
    }

    fn fail(&self, connection: &Connection, error: TypedError) {
        self.client.adopt_session(connection);
        self.client
            .send(OutboundFrame::error(Some(self.message_id.clone()), error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use serde_json::json;

    struct Harness {
        server: Server,
        client: SocketClient,
        rx: mpsc::UnboundedReceiver<OutboundFrame>,
    }

    impl Harness {
        async fn new() -> Self {
            let server = crate::create_server(&AppConfig::default()).await.unwrap();
            let (tx, rx) = mpsc::unbounded_channel();
            server.hub.connect("socket-1", tx.clone()).await;
            let client = SocketClient::new("socket-1", server.clone(), tx, None);

            Self { server, client, rx }
        }

        async fn send(&mut self, frame: Value) -> Value {
            self.send_text(&frame.to_string()).await
        }

        async fn send_text(&mut self, text: &str) -> Value {
            self.client.handle_text(text).await;
            self.rx.recv().await.unwrap().to_json()
        }

        async fn call(&mut self, id: &str, action: &str, params: Value) -> Value {
            self.send(json!({
                "messageType": "action",
                "messageId": id,
                "action": action,
                "params": params
            }))
            .await
        }
    }

    #[tokio::test]
    async fn test_subscribe_reply() {
        let mut ws = Harness::new().await;

        let reply = ws
            .send(json!({"messageType": "subscribe", "messageId": "m1", "channel": "c"}))
            .await;

        assert_eq!(reply, json!({"messageId": "m1", "subscribed": {"channel": "c"}}));
        assert_eq!(ws.server.hub.subscriptions("socket-1").await, vec!["c"]);
    }

    #[tokio::test]
    async fn test_late_subscribe_after_close_leaves_no_membership() {
        let mut ws = Harness::new().await;
        ws.server.hub.disconnect("socket-1").await;

        ws.client
            .handle_text(&json!({"messageType": "subscribe", "messageId": "m1", "channel": "c"}).to_string())
            .await;

        assert!(ws.server.hub.subscriptions("socket-1").await.is_empty());
        assert_eq!(ws.server.hub.subscriber_count("c").await, 0);
        assert!(ws.rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_unsubscribe_reply() {
        let mut ws = Harness::new().await;
        ws.send(json!({"messageType": "subscribe", "messageId": "m1", "channel": "c"}))
            .await;

        let reply = ws
            .send(json!({"messageType": "unsubscribe", "messageId": "m2", "channel": "c"}))
            .await;

        assert_eq!(reply, json!({"messageId": "m2", "unsubscribed": {"channel": "c"}}));
        assert!(ws.server.hub.subscriptions("socket-1").await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let mut ws = Harness::new().await;

        let reply = ws.send_text("not json").await;

        assert!(reply.get("messageId").is_none());
        let message = reply["error"]["message"].as_str().unwrap();
        assert!(message.contains("JSON Parse error"), "{}", message);
    }

    #[tokio::test]
    async fn test_unknown_message_type() {
        let mut ws = Harness::new().await;

        for frame in [
            json!({"messageType": "bogus"}),
            json!({"messageType": 5}),
            json!({"messageType": null, "channel": 7}),
            json!({}),
            json!([1, 2]),
        ] {
            let reply = ws.send(frame).await;
            let message = reply["error"]["message"].as_str().unwrap();
            assert!(message.contains("messageType either missing or unknown"));
        }
    }

    #[tokio::test]
    async fn test_badly_typed_field_on_known_type() {
        let mut ws = Harness::new().await;

        let reply = ws
            .send(json!({"messageType": "subscribe", "messageId": "m1", "channel": 7}))
            .await;

        let message = reply["error"]["message"].as_str().unwrap();
        assert!(message.starts_with("Invalid frame"), "{}", message);
    }

    #[tokio::test]
    async fn test_ping() {
        let mut ws = Harness::new().await;

        assert_eq!(
            ws.send(json!({"messageType": "ping"})).await,
            json!({"messageType": "pong"})
        );
        assert_eq!(
            ws.send(json!({"messageType": "ping", "messageId": 4})).await,
            json!({"messageType": "pong", "messageId": 4})
        );
    }

    #[tokio::test]
    async fn test_subscribe_without_channel() {
        let mut ws = Harness::new().await;

        let reply = ws.send(json!({"messageType": "subscribe", "messageId": "m1"})).await;

        assert_eq!(reply["messageId"], "m1");
        assert_eq!(reply["error"]["type"], "ACTION_PARAM_VALIDATION");
        assert_eq!(reply["error"]["key"], "channel");
    }

    #[tokio::test]
    async fn test_action_requires_message_id() {
        let mut ws = Harness::new().await;

        let reply = ws.send(json!({"messageType": "action", "action": "status"})).await;

        assert!(reply.get("messageId").is_none());
        assert!(reply["error"]["message"].as_str().unwrap().contains("messageId"));
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let mut ws = Harness::new().await;

        let reply = ws.call("m9", "nope:nothing", json!({})).await;

        assert_eq!(reply["messageId"], "m9");
        assert_eq!(reply["error"]["type"], "ACTION_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_action_response_echoes_message_id() {
        let mut ws = Harness::new().await;

        let reply = ws.call("m2", "status", json!({})).await;

        assert_eq!(reply["messageId"], "m2");
        assert_eq!(reply["response"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_socket_adopts_session() {
        let mut ws = Harness::new().await;
        let credentials = json!({"email": "ada@example.com", "password": "password123"});

        let denied = ws.call("a0", "agent:list", json!({})).await;
        assert_eq!(denied["error"]["type"], "SESSION_NOT_FOUND");

        let created = ws
            .call("a1", "user:create", json!({"name": "Ada", "email": "ada@example.com", "password": "password123"}))
            .await;
        let user_id = created["response"]["user"]["id"].clone();

        let signed_in = ws.call("a2", "session:create", credentials).await;
        assert_eq!(signed_in["response"]["user"]["id"], user_id);

        let agent = ws
            .call("a3", "agent:create", json!({"name": "Helper", "systemPrompt": "Be brief."}))
            .await;
        assert_eq!(agent["response"]["agent"]["userId"], user_id);
        assert_eq!(agent["response"]["agent"]["model"], "gpt-4o");

        let signed_out = ws.call("a4", "session:destroy", json!({})).await;
        assert_eq!(signed_out["response"]["success"], true);

        let denied = ws.call("a5", "agent:list", json!({})).await;
        assert_eq!(denied["error"]["type"], "SESSION_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_broadcast_frame_delivered() {
        let mut ws = Harness::new().await;
        ws.send(json!({"messageType": "subscribe", "messageId": "m1", "channel": "room"}))
            .await;

        ws.server.hub.broadcast("room", json!({"text": "hello"})).await;

        assert_eq!(
            ws.rx.recv().await.unwrap().to_json(),
            json!({"messageType": "broadcast", "channel": "room", "message": {"text": "hello"}})
        );
    }
}
