use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Voice,
    Attachment,
    Location,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageAttachment {
    pub id: Uuid,
    pub file_name: String,
    pub file_type: Option<String>,
    pub file_size: i64,
}

/// Stored message row. Content is ciphertext only; plaintext exists in
/// responses, never at rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub kind: MessageType,
    pub key_id: Uuid,
    pub content_encrypted: Vec<u8>,
    pub content_nonce: Vec<u8>,
    pub reply_to_message_id: Option<Uuid>,
    pub attachments: Vec<MessageAttachment>,
    pub is_edited: bool,
    pub last_edited_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub sent_at: DateTime<Utc>,
}

/// One row per (message, reader); duplicate mark-read calls are no-ops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub read_at: DateTime<Utc>,
    pub device_info: Option<String>,
}

/// Response shape with plaintext restored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub kind: MessageType,
    pub content: String,
    pub reply_to_message_id: Option<Uuid>,
    pub attachments: Vec<MessageAttachment>,
    pub is_edited: bool,
    pub last_edited_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub sent_at: DateTime<Utc>,
}

impl MessageDto {
    pub fn from_message(message: &Message, content: String) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            kind: message.kind,
            content,
            reply_to_message_id: message.reply_to_message_id,
            attachments: message.attachments.clone(),
            is_edited: message.is_edited,
            last_edited_at: message.last_edited_at,
            is_deleted: message.is_deleted,
            sent_at: message.sent_at,
        }
    }
}
