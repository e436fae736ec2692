use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events sent over the chat WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Connection accepted and joined to a product conversation
    Ready { username: String, product_id: Uuid },

    /// A chat message was stored
    Message {
        message_id: Uuid,
        product_id: Uuid,
        username: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl ChatEvent {
    /// Returns the product conversation this event belongs to, if any.
    pub fn product_id(&self) -> Option<Uuid> {
        match self {
            Self::Message { product_id, .. } => Some(*product_id),
            Self::Ready { .. } => None,
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChatCommand {
    SendMessage { product_id: Uuid, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_message_command_wire_format() {
        let product_id = Uuid::new_v4();
        let raw = format!(
            r#"{{"type":"send_message","data":{{"product_id":"{}","message":"still available?"}}}}"#,
            product_id
        );
        let ChatCommand::SendMessage { product_id: parsed, message } =
            serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, product_id);
        assert_eq!(message, "still available?");
    }

    #[test]
    fn message_event_wire_format() {
        let event = ChatEvent::Message {
            message_id: Uuid::nil(),
            product_id: Uuid::nil(),
            username: "alice".into(),
            message: "hi".into(),
            timestamp: DateTime::<Utc>::default(),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["data"]["username"], "alice");
        assert_eq!(json["data"]["message"], "hi");
        assert_eq!(json["data"]["message_id"], Uuid::nil().to_string());
        assert_eq!(event.product_id(), Some(Uuid::nil()));
    }
}
