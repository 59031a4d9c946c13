use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Events fanned out to conversation subscribers. Payloads carry ids and
/// metadata only; ciphertext and key material never cross this boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    MessageNew {
        conversation_id: Uuid,
        message_id: Uuid,
        sender_id: Uuid,
        sent_at: DateTime<Utc>,
    },
    MessageEdited {
        conversation_id: Uuid,
        message_id: Uuid,
        edited_at: DateTime<Utc>,
    },
    MessageDeleted {
        conversation_id: Uuid,
        message_id: Uuid,
    },
    MessageDestroyed {
        conversation_id: Uuid,
        message_id: Uuid,
        reason: String,
    },
    MessageRead {
        conversation_id: Uuid,
        message_id: Uuid,
        reader_id: Uuid,
    },
    TypingStarted {
        conversation_id: Uuid,
        user_id: Uuid,
    },
    TypingStopped {
        conversation_id: Uuid,
        user_id: Uuid,
    },
    UnreadCountUpdated {
        conversation_id: Uuid,
        user_id: Uuid,
        unread_count: u64,
    },
    ParticipantJoined {
        conversation_id: Uuid,
        user_id: Uuid,
    },
    ParticipantLeft {
        conversation_id: Uuid,
        user_id: Uuid,
    },
    KeysRotated {
        conversation_id: Uuid,
        key_id: Uuid,
        fingerprint: String,
    },
}

impl RealtimeEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            RealtimeEvent::MessageNew { .. } => "message.new",
            RealtimeEvent::MessageEdited { .. } => "message.edited",
            RealtimeEvent::MessageDeleted { .. } => "message.deleted",
            RealtimeEvent::MessageDestroyed { .. } => "message.destroyed",
            RealtimeEvent::MessageRead { .. } => "message.read",
            RealtimeEvent::TypingStarted { .. } => "typing.started",
            RealtimeEvent::TypingStopped { .. } => "typing.stopped",
            RealtimeEvent::UnreadCountUpdated { .. } => "unread_count.updated",
            RealtimeEvent::ParticipantJoined { .. } => "participant.joined",
            RealtimeEvent::ParticipantLeft { .. } => "participant.left",
            RealtimeEvent::KeysRotated { .. } => "keys.rotated",
        }
    }

    pub fn conversation_id(&self) -> Uuid {
        match self {
            RealtimeEvent::MessageNew { conversation_id, .. }
            | RealtimeEvent::MessageEdited { conversation_id, .. }
            | RealtimeEvent::MessageDeleted { conversation_id, .. }
            | RealtimeEvent::MessageDestroyed { conversation_id, .. }
            | RealtimeEvent::MessageRead { conversation_id, .. }
            | RealtimeEvent::TypingStarted { conversation_id, .. }
            | RealtimeEvent::TypingStopped { conversation_id, .. }
            | RealtimeEvent::UnreadCountUpdated { conversation_id, .. }
            | RealtimeEvent::ParticipantJoined { conversation_id, .. }
            | RealtimeEvent::ParticipantLeft { conversation_id, .. }
            | RealtimeEvent::KeysRotated { conversation_id, .. } => *conversation_id,
        }
    }

    /// Flat JSON shape pushed over the wire.
    pub fn to_broadcast_payload(&self) -> Value {
        let mut payload = json!({
            "event": self.event_type(),
            "conversation_id": self.conversation_id(),
        });
        let extra = match self {
            RealtimeEvent::MessageNew {
                message_id,
                sender_id,
                sent_at,
                ..
            } => json!({
                "message_id": message_id,
                "sender_id": sender_id,
                "sent_at": sent_at,
            }),
            RealtimeEvent::MessageEdited {
                message_id,
                edited_at,
                ..
            } => json!({ "message_id": message_id, "edited_at": edited_at }),
            RealtimeEvent::MessageDeleted { message_id, .. } => {
                json!({ "message_id": message_id })
            }
            RealtimeEvent::MessageDestroyed {
                message_id, reason, ..
            } => json!({ "message_id": message_id, "reason": reason }),
            RealtimeEvent::MessageRead {
                message_id,
                reader_id,
                ..
            } => json!({ "message_id": message_id, "reader_id": reader_id }),
            RealtimeEvent::TypingStarted { user_id, .. }
            | RealtimeEvent::TypingStopped { user_id, .. }
            | RealtimeEvent::ParticipantJoined { user_id, .. }
            | RealtimeEvent::ParticipantLeft { user_id, .. } => {
                json!({ "user_id": user_id })
            }
            RealtimeEvent::UnreadCountUpdated {
                user_id,
                unread_count,
                ..
            } => json!({ "user_id": user_id, "unread_count": unread_count }),
            RealtimeEvent::KeysRotated {
                key_id,
                fingerprint,
                ..
            } => json!({ "key_id": key_id, "fingerprint": fingerprint }),
        };
        if let (Some(map), Some(extra)) = (payload.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                map.insert(k.clone(), v.clone());
            }
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_are_namespaced() {
        let event = RealtimeEvent::MessageNew {
            conversation_id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            sent_at: Utc::now(),
        };
        assert_eq!(event.event_type(), "message.new");
    }

    #[test]
    fn broadcast_payload_is_flat() {
        let conversation_id = Uuid::new_v4();
        let key_id = Uuid::new_v4();
        let event = RealtimeEvent::KeysRotated {
            conversation_id,
            key_id,
            fingerprint: "ab12cd34".to_string(),
        };
        let payload = event.to_broadcast_payload();
        assert_eq!(payload["event"], "keys.rotated");
        assert_eq!(payload["conversation_id"], json!(conversation_id));
        assert_eq!(payload["key_id"], json!(key_id));
        assert_eq!(payload["fingerprint"], "ab12cd34");
    }
}
