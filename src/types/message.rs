use serde::{Deserialize, Serialize};

use crate::messaging::Event;

/// Wire envelope for every message exchanged with the server.
///
/// `ref` correlates replies to requests; `join_ref` ties channel traffic to
/// the join that activated the channel. Both are omitted from the wire when
/// absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushMessage {
    pub topic: String,
    pub event: Event,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

impl PushMessage {
    pub fn new(topic: String, event: Event, payload: serde_json::Value) -> Self {
        Self {
            topic,
            event,
            payload,
            r#ref: None,
            join_ref: None,
        }
    }

    pub fn with_ref(mut self, r#ref: String) -> Self {
        self.r#ref = Some(r#ref);
        self
    }

    pub fn with_join_ref(mut self, join_ref: String) -> Self {
        self.join_ref = Some(join_ref);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_message() {
        let message = PushMessage::new(
            "room:lobby".to_string(),
            Event::Custom("message".to_string()),
            serde_json::Value::Null,
        );
        assert_eq!(message.topic, "room:lobby");
        assert_eq!(message.event, Event::Custom("message".to_string()));
        assert_eq!(message.payload, serde_json::Value::Null);
        assert_eq!(message.r#ref, None);
        assert_eq!(message.join_ref, None);
    }

    #[test]
    fn test_push_message_round_trip() {
        let message = PushMessage::new(
            "room:lobby".to_string(),
            Event::Custom("message".to_string()),
            serde_json::json!({"body": "hi"}),
        )
        .with_ref("1".to_string())
        .with_join_ref("321".to_string());

        let serialized = serde_json::to_string(&message).unwrap();
        let deserialized: PushMessage = serde_json::from_str(&serialized).unwrap();

        assert_eq!(message, deserialized);
    }

    #[test]
    fn test_serialization_omits_absent_refs() {
        let message = PushMessage::new(
            "room:lobby".to_string(),
            Event::Custom("message".to_string()),
            serde_json::Value::Null,
        );

        let json = serde_json::to_string(&message).unwrap();
        assert!(!json.contains(r#""ref":"#));
        assert!(!json.contains(r#""join_ref":"#));
    }

    #[test]
    fn test_serialization_with_refs() {
        let message = PushMessage::new(
            "room:lobby".to_string(),
            Event::Custom("message".to_string()),
            serde_json::Value::Null,
        )
        .with_ref("123".to_string())
        .with_join_ref("321".to_string());

        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains(r#""ref":"123""#));
        assert!(json.contains(r#""join_ref":"321""#));
    }

    #[test]
    fn test_missing_payload_defaults_to_null() {
        let raw = r#"{"topic":"phoenix","event":"phx_reply","ref":"7"}"#;
        let message: PushMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(message.payload, serde_json::Value::Null);
        assert_eq!(message.r#ref.as_deref(), Some("7"));
    }
}
