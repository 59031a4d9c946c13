use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationType {
    Direct,
    Group,
}

impl ConversationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationType::Direct => "direct",
            ConversationType::Group => "group",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Admin,
    Member,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Admin => "admin",
            MemberRole::Member => "member",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub kind: ConversationType,
    pub name: Option<String>,
    pub created_by: Uuid,
    pub is_archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub is_pinned: bool,
    pub is_muted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(kind: ConversationType, name: Option<String>, created_by: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            name,
            created_by,
            is_archived: false,
            archived_at: None,
            is_pinned: false,
            is_muted: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Membership row. (conversation_id, user_id) is unique in every store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationParticipant {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
    pub last_read_at: Option<DateTime<Utc>>,
}

impl ConversationParticipant {
    pub fn new(conversation_id: Uuid, user_id: Uuid, role: MemberRole) -> Self {
        Self {
            conversation_id,
            user_id,
            role,
            joined_at: Utc::now(),
            last_read_at: None,
        }
    }
}
