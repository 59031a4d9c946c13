//! Storage ports, one narrow trait per aggregate.
//!
//! The core logic only talks to these traits; the bundled implementation is
//! the in-memory [`MemoryStore`], which implements the transactional
//! invariants (atomic view counting, single-Active-key rotation, the ≥1-admin
//! rule) inside single write-lock critical sections. A SQL-backed
//! implementation would use one transaction per such method.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    Conversation, ConversationParticipant, EncryptionKey, MemberRole, Message, MessageAccessLog,
    MessageSecurity, MessageViewRecord, ReadReceipt, SecurityIncident, SelfDestructPolicy,
    VoiceMessage, VoiceTranscription,
};

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn insert(
        &self,
        conversation: Conversation,
        participants: Vec<ConversationParticipant>,
    ) -> AppResult<()>;
    async fn get(&self, id: Uuid) -> AppResult<Option<Conversation>>;
    async fn update(&self, conversation: Conversation) -> AppResult<()>;
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Conversation>>;
    async fn participants(&self, conversation_id: Uuid) -> AppResult<Vec<ConversationParticipant>>;
    async fn is_participant(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<bool>;
    /// Fails with `AlreadyExists` when the (conversation, user) pair is present.
    async fn add_participant(&self, participant: ConversationParticipant) -> AppResult<()>;
    /// Fails with `Conflict` when removal would leave the conversation
    /// without an admin. The check runs in the same critical section as the
    /// removal.
    async fn remove_participant(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<()>;
    /// Same admin guarantee as `remove_participant`, for demotions.
    async fn change_role(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> AppResult<()>;
    async fn set_last_read(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<()>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, message: Message) -> AppResult<()>;
    async fn get(&self, id: Uuid) -> AppResult<Option<Message>>;
    async fn update(&self, message: Message) -> AppResult<()>;
    /// Newest-first page. Soft-deleted messages are filtered out unless the
    /// viewer is their sender.
    async fn page_for_conversation(
        &self,
        conversation_id: Uuid,
        viewer_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> AppResult<Vec<Message>>;
    /// Returns false when the receipt already existed (idempotent).
    async fn mark_read(&self, receipt: ReadReceipt) -> AppResult<bool>;
    async fn unread_count(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<u64>;
}

#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn insert(&self, key: EncryptionKey) -> AppResult<()>;
    async fn get(&self, id: Uuid) -> AppResult<Option<EncryptionKey>>;
    async fn active_for_conversation(
        &self,
        conversation_id: Uuid,
    ) -> AppResult<Option<EncryptionKey>>;
    async fn keys_for_conversation(&self, conversation_id: Uuid) -> AppResult<Vec<EncryptionKey>>;
    /// Atomically revoke every non-revoked key of the conversation and
    /// activate `new_key`. No interleaving observes two Active keys or none.
    async fn rotate(&self, new_key: EncryptionKey, rotated_by: Uuid) -> AppResult<EncryptionKey>;
    /// Idempotent; returns the key either way.
    async fn revoke(
        &self,
        key_id: Uuid,
        revoked_by: Uuid,
        reason: Option<String>,
    ) -> AppResult<EncryptionKey>;
}

/// Result of the atomic increment-and-compare on a view-based policy.
#[derive(Debug, Clone, Copy)]
pub struct ViewOutcome {
    pub view_count: u32,
    /// True exactly once: for the view that reached `max_views`.
    pub destroyed_now: bool,
    pub already_destroyed: bool,
}

#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn upsert(&self, policy: SelfDestructPolicy) -> AppResult<()>;
    async fn get(&self, message_id: Uuid) -> AppResult<Option<SelfDestructPolicy>>;
    /// Single atomic read-modify-write: increments the view count, records
    /// the view, and triggers destruction iff the count reaches `max_views`.
    async fn record_view(
        &self,
        message_id: Uuid,
        view: MessageViewRecord,
    ) -> AppResult<ViewOutcome>;
    /// One-way transition; returns false when already destroyed.
    async fn destroy(&self, message_id: Uuid, reason: &str, at: DateTime<Utc>) -> AppResult<bool>;
    /// Cancel a pending policy. Returns false when nothing was configured.
    async fn remove(&self, message_id: Uuid) -> AppResult<bool>;
    /// Timer-mode policies whose destruct instant is at or before `before`.
    async fn due_for_destruction(
        &self,
        before: DateTime<Utc>,
    ) -> AppResult<Vec<SelfDestructPolicy>>;
    async fn views(&self, message_id: Uuid) -> AppResult<Vec<MessageViewRecord>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AccessStats {
    pub total: u64,
    pub denied: u64,
}

#[async_trait]
pub trait SecurityStore: Send + Sync {
    async fn upsert_security(&self, security: MessageSecurity) -> AppResult<()>;
    async fn get_security(&self, message_id: Uuid) -> AppResult<Option<MessageSecurity>>;
    async fn append_access_log(&self, log: MessageAccessLog) -> AppResult<()>;
    async fn access_logs(&self, message_id: Uuid, limit: usize) -> AppResult<Vec<MessageAccessLog>>;
    async fn user_access_stats(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<AccessStats>;
    async fn insert_incident(&self, incident: SecurityIncident) -> AppResult<()>;
    async fn get_incident(&self, id: Uuid) -> AppResult<Option<SecurityIncident>>;
    /// Terminal transition. Fails with `Conflict` when already resolved.
    async fn resolve_incident(
        &self,
        id: Uuid,
        resolved_by: Uuid,
        summary: String,
        at: DateTime<Utc>,
    ) -> AppResult<SecurityIncident>;
    async fn incidents_for_user(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<SecurityIncident>>;
}

#[async_trait]
pub trait VoiceStore: Send + Sync {
    async fn insert(&self, voice: VoiceMessage) -> AppResult<()>;
    async fn get(&self, id: Uuid) -> AppResult<Option<VoiceMessage>>;
    async fn update(&self, voice: VoiceMessage) -> AppResult<()>;
    async fn append_transcription(&self, transcription: VoiceTranscription) -> AppResult<()>;
    async fn transcriptions(&self, voice_message_id: Uuid) -> AppResult<Vec<VoiceTranscription>>;
}
