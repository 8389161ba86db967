//! Socket event payloads.
//!
//! Browser frames carry only what the visitor chose (text, conversation,
//! typing state). The relay stamps the sender from the session identity
//! before forwarding, so a browser cannot speak for someone else.

use serde::{Deserialize, Serialize};

use brewhouse_core::ConversationId;

use crate::backend::types::{ChatMessage, ChatRole};

// =============================================================================
// Browser -> Storefront
// =============================================================================

/// An event sent by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    SendMessage {
        #[serde(default)]
        conversation_id: Option<ConversationId>,
        text: String,
    },
    Typing {
        #[serde(default)]
        conversation_id: Option<ConversationId>,
        is_typing: bool,
    },
}

// =============================================================================
// Storefront -> Backend
// =============================================================================

/// Sent once right after the upstream connection opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPayload {
    pub id: String,
    pub role: ChatRole,
}

/// An event sent to the backend socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum UpstreamEvent {
    Join(JoinPayload),
    SendMessage {
        conversation_id: Option<ConversationId>,
        sender_id: String,
        sender_role: ChatRole,
        text: String,
    },
    Typing {
        conversation_id: Option<ConversationId>,
        sender_id: String,
        sender_role: ChatRole,
        is_typing: bool,
    },
}

impl UpstreamEvent {
    /// Stamp a browser event with the sender's identity.
    ///
    /// Messages that are blank after trimming are dropped.
    #[must_use]
    pub fn from_client(event: ClientEvent, sender_id: &str, sender_role: ChatRole) -> Option<Self> {
        match event {
            ClientEvent::SendMessage {
                conversation_id,
                text,
            } => {
                let text = text.trim();
                (!text.is_empty()).then(|| Self::SendMessage {
                    conversation_id,
                    sender_id: sender_id.to_string(),
                    sender_role,
                    text: text.to_string(),
                })
            }
            ClientEvent::Typing {
                conversation_id,
                is_typing,
            } => Some(Self::Typing {
                conversation_id,
                sender_id: sender_id.to_string(),
                sender_role,
                is_typing,
            }),
        }
    }
}

// =============================================================================
// Backend -> Browser
// =============================================================================

/// Someone came online or went away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceNotice {
    #[serde(alias = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub role: Option<ChatRole>,
    pub online: bool,
}

/// The other side started or stopped typing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingNotice {
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    pub sender_id: String,
    pub sender_role: ChatRole,
    pub is_typing: bool,
}

/// An event pushed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    ReceiveMessage(ChatMessage),
    Presence(PresenceNotice),
    Typing(TypingNotice),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_client_event_wire_format() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "send_message",
            "data": { "conversation_id": "c1", "text": "Masih buka?" }
        }))
        .unwrap();

        assert_eq!(
            event,
            ClientEvent::SendMessage {
                conversation_id: Some(ConversationId::new("c1")),
                text: "Masih buka?".to_string(),
            }
        );
    }

    #[test]
    fn test_join_wire_format() {
        let join = UpstreamEvent::Join(JoinPayload {
            id: "u1".to_string(),
            role: ChatRole::User,
        });
        assert_eq!(
            serde_json::to_value(&join).unwrap(),
            json!({ "event": "join", "data": { "id": "u1", "role": "user" } })
        );
    }

    #[test]
    fn test_sender_is_stamped_from_identity() {
        let event = ClientEvent::SendMessage {
            conversation_id: None,
            text: "  halo  ".to_string(),
        };
        let upstream = UpstreamEvent::from_client(event, "u1", ChatRole::User).unwrap();
        assert_eq!(
            upstream,
            UpstreamEvent::SendMessage {
                conversation_id: None,
                sender_id: "u1".to_string(),
                sender_role: ChatRole::User,
                text: "halo".to_string(),
            }
        );
    }

    #[test]
    fn test_blank_message_is_dropped() {
        let event = ClientEvent::SendMessage {
            conversation_id: None,
            text: "   ".to_string(),
        };
        assert!(UpstreamEvent::from_client(event, "u1", ChatRole::User).is_none());
    }

    #[test]
    fn test_server_events_parse() {
        let presence: ServerEvent = serde_json::from_value(json!({
            "event": "presence",
            "data": { "userId": "u9", "online": true }
        }))
        .unwrap();
        assert!(matches!(presence, ServerEvent::Presence(p) if p.user_id == "u9" && p.online));

        let message: ServerEvent = serde_json::from_value(json!({
            "event": "receive_message",
            "data": {
                "_id": "m1",
                "conversation_id": "c1",
                "sender_id": "a1",
                "sender_role": "admin",
                "text": "Buka sampai jam 10"
            }
        }))
        .unwrap();
        assert!(matches!(message, ServerEvent::ReceiveMessage(m) if m.text == "Buka sampai jam 10"));
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let result = serde_json::from_value::<ServerEvent>(json!({ "event": "kick", "data": {} }));
        assert!(result.is_err());
    }
}
