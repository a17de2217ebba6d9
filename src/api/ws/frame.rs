//! WebSocket frame shapes

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::TypedError;

/// Inbound frame; which fields are required depends on `messageType`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundFrame {
    pub message_type: Option<String>,
    pub message_id: Option<Value>,
    pub action: Option<String>,
    pub params: Option<Map<String, Value>>,
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Ping,
    Action,
    Subscribe,
    Unsubscribe,
}

impl MessageType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ping" => Some(Self::Ping),
            "action" => Some(Self::Action),
            "subscribe" => Some(Self::Subscribe),
            "unsubscribe" => Some(Self::Unsubscribe),
            _ => None,
        }
    }

    /// Kind named by a raw frame; `None` unless `messageType` is a known string
    pub fn of(frame: &Value) -> Option<Self> {
        frame
            .get("messageType")
            .and_then(Value::as_str)
            .and_then(Self::parse)
    }
}

impl InboundFrame {
    pub fn kind(&self) -> Option<MessageType> {
        MessageType::parse(self.message_type.as_deref()?)
    }

    /// `messageId` as a plain string for logs and the connection
    pub fn message_id_string(&self) -> Option<String> {
        match self.message_id.as_ref()? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelRef {
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameError {
    pub message: String,
}

/// Outbound frame, serialized without a tag
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum OutboundFrame {
    Pong {
        message_type: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<Value>,
    },
    Response {
        message_id: Value,
        response: Value,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<Value>,
        error: TypedError,
    },
    Subscribed {
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<Value>,
        subscribed: ChannelRef,
    },
    Unsubscribed {
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<Value>,
        unsubscribed: ChannelRef,
    },
    Broadcast {
        message_type: &'static str,
        channel: String,
        message: Value,
    },
    /// Frame that could not be understood; carries no `messageId`
    Invalid { error: FrameError },
}

impl OutboundFrame {
    pub fn pong(message_id: Option<Value>) -> Self {
        Self::Pong {
            message_type: "pong",
            message_id,
        }
    }

    pub fn response(message_id: Value, response: Value) -> Self {
        Self::Response {
            message_id,
            response,
        }
    }

    pub fn error(message_id: Option<Value>, error: TypedError) -> Self {
        Self::Error { message_id, error }
    }

    pub fn subscribed(message_id: Option<Value>, channel: impl Into<String>) -> Self {
        Self::Subscribed {
            message_id,
            subscribed: ChannelRef {
                channel: channel.into(),
            },
        }
    }

    pub fn unsubscribed(message_id: Option<Value>, channel: impl Into<String>) -> Self {
        Self::Unsubscribed {
            message_id,
            unsubscribed: ChannelRef {
                channel: channel.into(),
            },
        }
    }

    pub fn broadcast(channel: impl Into<String>, message: Value) -> Self {
        Self::Broadcast {
            message_type: "broadcast",
            channel: channel.into(),
            message,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            error: FrameError {
                message: message.into(),
            },
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({ "error": { "message": format!("Failed to encode frame: {}", e) } })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inbound_kind() {
        let frame: InboundFrame =
            serde_json::from_value(json!({"messageType": "subscribe", "messageId": 7, "channel": "c"}))
                .unwrap();

        assert_eq!(frame.kind(), Some(MessageType::Subscribe));
        assert_eq!(frame.message_id_string().as_deref(), Some("7"));

        let unknown: InboundFrame = serde_json::from_value(json!({"messageType": "bogus"})).unwrap();
        assert_eq!(unknown.kind(), None);
        assert_eq!(InboundFrame::default().kind(), None);
    }

    #[test]
    fn test_outbound_shapes() {
        assert_eq!(
            OutboundFrame::subscribed(Some(json!("m1")), "c").to_json(),
            json!({"messageId": "m1", "subscribed": {"channel": "c"}})
        );
        assert_eq!(
            OutboundFrame::response(json!("m2"), json!({"ok": true})).to_json(),
            json!({"messageId": "m2", "response": {"ok": true}})
        );
        assert_eq!(
            OutboundFrame::pong(None).to_json(),
            json!({"messageType": "pong"})
        );
        assert_eq!(
            OutboundFrame::broadcast("c", json!({"text": "hi"})).to_json(),
            json!({"messageType": "broadcast", "channel": "c", "message": {"text": "hi"}})
        );
        assert_eq!(
            OutboundFrame::invalid("nope").to_json(),
            json!({"error": {"message": "nope"}})
        );
    }

    #[test]
    fn test_error_frame_carries_typed_error() {
        let frame = OutboundFrame::error(Some(json!("m3")), TypedError::session_not_found());

        assert_eq!(
            frame.to_json(),
            json!({"messageId": "m3", "error": {"type": "SESSION_NOT_FOUND", "message": "Session not found"}})
        );
    }
}
