use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    Conversation, ConversationParticipant, EncryptionKey, MemberRole, Message, MessageAccessLog,
    MessageSecurity, MessageViewRecord, ReadReceipt, SecurityIncident, SelfDestructPolicy,
    IncidentStatus, VoiceMessage, VoiceTranscription,
};

use super::{
    AccessStats, ConversationStore, KeyStore, MessageStore, PolicyStore, SecurityStore,
    ViewOutcome, VoiceStore,
};

#[derive(Default)]
struct State {
    conversations: HashMap<Uuid, Conversation>,
    participants: HashMap<Uuid, Vec<ConversationParticipant>>,
    messages: HashMap<Uuid, Message>,
    receipts: HashMap<(Uuid, Uuid), ReadReceipt>,
    keys: HashMap<Uuid, EncryptionKey>,
    policies: HashMap<Uuid, SelfDestructPolicy>,
    views: HashMap<Uuid, Vec<MessageViewRecord>>,
    securities: HashMap<Uuid, MessageSecurity>,
    access_logs: Vec<MessageAccessLog>,
    incidents: HashMap<Uuid, SecurityIncident>,
    voice: HashMap<Uuid, VoiceMessage>,
    transcriptions: HashMap<Uuid, Vec<VoiceTranscription>>,
}

/// In-memory store backing every aggregate port. Methods that must be
/// transactional run entirely under one write guard.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn insert(
        &self,
        conversation: Conversation,
        participants: Vec<ConversationParticipant>,
    ) -> AppResult<()> {
        let mut state = self.inner.write().await;
        state
            .participants
            .insert(conversation.id, participants);
        state.conversations.insert(conversation.id, conversation);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Conversation>> {
        Ok(self.inner.read().await.conversations.get(&id).cloned())
    }

    async fn update(&self, conversation: Conversation) -> AppResult<()> {
        let mut state = self.inner.write().await;
        if !state.conversations.contains_key(&conversation.id) {
            return Err(AppError::NotFound("conversation"));
        }
        state.conversations.insert(conversation.id, conversation);
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Conversation>> {
        let state = self.inner.read().await;
        let mut out: Vec<Conversation> = state
            .participants
            .iter()
            .filter(|(_, members)| members.iter().any(|m| m.user_id == user_id))
            .filter_map(|(id, _)| state.conversations.get(id).cloned())
            .collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(out)
    }

    async fn participants(&self, conversation_id: Uuid) -> AppResult<Vec<ConversationParticipant>> {
        Ok(self
            .inner
            .read()
            .await
            .participants
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn is_participant(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        Ok(self
            .inner
            .read()
            .await
            .participants
            .get(&conversation_id)
            .map(|members| members.iter().any(|m| m.user_id == user_id))
            .unwrap_or(false))
    }

    async fn add_participant(&self, participant: ConversationParticipant) -> AppResult<()> {
        let mut state = self.inner.write().await;
        if !state
            .conversations
            .contains_key(&participant.conversation_id)
        {
            return Err(AppError::NotFound("conversation"));
        }
        let members = state
            .participants
            .entry(participant.conversation_id)
            .or_default();
        if members.iter().any(|m| m.user_id == participant.user_id) {
            return Err(AppError::AlreadyExists("participant".into()));
        }
        members.push(participant);
        Ok(())
    }

    async fn remove_participant(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let mut state = self.inner.write().await;
        let members = state
            .participants
            .get_mut(&conversation_id)
            .ok_or(AppError::NotFound("conversation"))?;
        let target = members
            .iter()
            .position(|m| m.user_id == user_id)
            .ok_or(AppError::NotFound("participant"))?;
        let leaving_admin = members[target].role == MemberRole::Admin;
        if leaving_admin {
            let admins = members
                .iter()
                .filter(|m| m.role == MemberRole::Admin)
                .count();
            let remaining = members.len() - 1;
            if admins == 1 && remaining > 0 {
                return Err(AppError::Conflict(
                    "cannot remove the last admin of a conversation".into(),
                ));
            }
        }
        members.remove(target);
        Ok(())
    }

    async fn change_role(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> AppResult<()> {
        let mut state = self.inner.write().await;
        let members = state
            .participants
            .get_mut(&conversation_id)
            .ok_or(AppError::NotFound("conversation"))?;
        let target = members
            .iter()
            .position(|m| m.user_id == user_id)
            .ok_or(AppError::NotFound("participant"))?;
        let demoting_admin = members[target].role == MemberRole::Admin && role != MemberRole::Admin;
        if demoting_admin {
            let admins = members
                .iter()
                .filter(|m| m.role == MemberRole::Admin)
                .count();
            if admins == 1 {
                return Err(AppError::Conflict(
                    "cannot demote the last admin of a conversation".into(),
                ));
            }
        }
        members[target].role = role;
        Ok(())
    }

    async fn set_last_read(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut state = self.inner.write().await;
        if let Some(members) = state.participants.get_mut(&conversation_id) {
            if let Some(member) = members.iter_mut().find(|m| m.user_id == user_id) {
                // Monotonic watermark; concurrent reads never move it backwards.
                if member.last_read_at.map(|prev| at > prev).unwrap_or(true) {
                    member.last_read_at = Some(at);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert(&self, message: Message) -> AppResult<()> {
        let mut state = self.inner.write().await;
        if let Some(conversation) = state.conversations.get_mut(&message.conversation_id) {
            conversation.updated_at = message.sent_at;
        }
        state.messages.insert(message.id, message);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Message>> {
        Ok(self.inner.read().await.messages.get(&id).cloned())
    }

    async fn update(&self, message: Message) -> AppResult<()> {
        let mut state = self.inner.write().await;
        if !state.messages.contains_key(&message.id) {
            return Err(AppError::NotFound("message"));
        }
        state.messages.insert(message.id, message);
        Ok(())
    }

    async fn page_for_conversation(
        &self,
        conversation_id: Uuid,
        viewer_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> AppResult<Vec<Message>> {
        let state = self.inner.read().await;
        let mut rows: Vec<Message> = state
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .filter(|m| !m.is_deleted || m.sender_id == viewer_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        let start = (page as usize) * (page_size as usize);
        Ok(rows.into_iter().skip(start).take(page_size as usize).collect())
    }

    async fn mark_read(&self, receipt: ReadReceipt) -> AppResult<bool> {
        let mut state = self.inner.write().await;
        let key = (receipt.message_id, receipt.user_id);
        if state.receipts.contains_key(&key) {
            return Ok(false);
        }
        state.receipts.insert(key, receipt);
        Ok(true)
    }

    async fn unread_count(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<u64> {
        let state = self.inner.read().await;
        let last_read = state
            .participants
            .get(&conversation_id)
            .and_then(|members| members.iter().find(|m| m.user_id == user_id))
            .and_then(|m| m.last_read_at);
        let count = state
            .messages
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .filter(|m| !m.is_deleted && m.sender_id != user_id)
            .filter(|m| last_read.map(|at| m.sent_at > at).unwrap_or(true))
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl KeyStore for MemoryStore {
    async fn insert(&self, key: EncryptionKey) -> AppResult<()> {
        self.inner.write().await.keys.insert(key.id, key);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<EncryptionKey>> {
        Ok(self.inner.read().await.keys.get(&id).cloned())
    }

    async fn active_for_conversation(
        &self,
        conversation_id: Uuid,
    ) -> AppResult<Option<EncryptionKey>> {
        let now = Utc::now();
        Ok(self
            .inner
            .read()
            .await
            .keys
            .values()
            .find(|k| k.conversation_id == conversation_id && k.is_active(now))
            .cloned())
    }

    async fn keys_for_conversation(&self, conversation_id: Uuid) -> AppResult<Vec<EncryptionKey>> {
        let mut out: Vec<EncryptionKey> = self
            .inner
            .read()
            .await
            .keys
            .values()
            .filter(|k| k.conversation_id == conversation_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn rotate(&self, new_key: EncryptionKey, rotated_by: Uuid) -> AppResult<EncryptionKey> {
        let mut state = self.inner.write().await;
        let now = Utc::now();
        for key in state
            .keys
            .values_mut()
            .filter(|k| k.conversation_id == new_key.conversation_id && !k.revoked)
        {
            key.revoked = true;
            key.revoked_at = Some(now);
            key.revoked_by = Some(rotated_by);
            key.revocation_reason = Some("rotated".into());
        }
        state.keys.insert(new_key.id, new_key.clone());
        Ok(new_key)
    }

    async fn revoke(
        &self,
        key_id: Uuid,
        revoked_by: Uuid,
        reason: Option<String>,
    ) -> AppResult<EncryptionKey> {
        let mut state = self.inner.write().await;
        let key = state
            .keys
            .get_mut(&key_id)
            .ok_or(AppError::NotFound("key"))?;
        if !key.revoked {
            key.revoked = true;
            key.revoked_at = Some(Utc::now());
            key.revoked_by = Some(revoked_by);
            key.revocation_reason = reason;
        }
        Ok(key.clone())
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn upsert(&self, policy: SelfDestructPolicy) -> AppResult<()> {
        self.inner
            .write()
            .await
            .policies
            .insert(policy.message_id, policy);
        Ok(())
    }

    async fn get(&self, message_id: Uuid) -> AppResult<Option<SelfDestructPolicy>> {
        Ok(self.inner.read().await.policies.get(&message_id).cloned())
    }

    async fn record_view(
        &self,
        message_id: Uuid,
        view: MessageViewRecord,
    ) -> AppResult<ViewOutcome> {
        let mut state = self.inner.write().await;
        let policy = state
            .policies
            .get_mut(&message_id)
            .ok_or(AppError::NotFound("self-destruct policy"))?;
        if policy.is_destroyed {
            return Ok(ViewOutcome {
                view_count: policy.view_count,
                destroyed_now: false,
                already_destroyed: true,
            });
        }
        policy.view_count += 1;
        let destroyed_now = policy
            .max_views
            .map(|max| policy.view_count >= max)
            .unwrap_or(false);
        if destroyed_now {
            policy.is_destroyed = true;
            policy.destroyed_at = Some(view.viewed_at);
            policy.destruction_reason = Some("view limit reached".into());
        }
        let view_count = policy.view_count;
        state.views.entry(message_id).or_default().push(view);
        Ok(ViewOutcome {
            view_count,
            destroyed_now,
            already_destroyed: false,
        })
    }

    async fn destroy(&self, message_id: Uuid, reason: &str, at: DateTime<Utc>) -> AppResult<bool> {
        let mut state = self.inner.write().await;
        let policy = state
            .policies
            .get_mut(&message_id)
            .ok_or(AppError::NotFound("self-destruct policy"))?;
        if policy.is_destroyed {
            return Ok(false);
        }
        policy.is_destroyed = true;
        policy.destroyed_at = Some(at);
        policy.destruction_reason = Some(reason.to_string());
        Ok(true)
    }

    async fn remove(&self, message_id: Uuid) -> AppResult<bool> {
        Ok(self
            .inner
            .write()
            .await
            .policies
            .remove(&message_id)
            .is_some())
    }

    async fn due_for_destruction(
        &self,
        before: DateTime<Utc>,
    ) -> AppResult<Vec<SelfDestructPolicy>> {
        Ok(self
            .inner
            .read()
            .await
            .policies
            .values()
            .filter(|p| !p.is_destroyed && p.timer_elapsed(before))
            .cloned()
            .collect())
    }

    async fn views(&self, message_id: Uuid) -> AppResult<Vec<MessageViewRecord>> {
        Ok(self
            .inner
            .read()
            .await
            .views
            .get(&message_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl SecurityStore for MemoryStore {
    async fn upsert_security(&self, security: MessageSecurity) -> AppResult<()> {
        self.inner
            .write()
            .await
            .securities
            .insert(security.message_id, security);
        Ok(())
    }

    async fn get_security(&self, message_id: Uuid) -> AppResult<Option<MessageSecurity>> {
        Ok(self
            .inner
            .read()
            .await
            .securities
            .get(&message_id)
            .cloned())
    }

    async fn append_access_log(&self, log: MessageAccessLog) -> AppResult<()> {
        self.inner.write().await.access_logs.push(log);
        Ok(())
    }

    async fn access_logs(&self, message_id: Uuid, limit: usize) -> AppResult<Vec<MessageAccessLog>> {
        let state = self.inner.read().await;
        let mut rows: Vec<MessageAccessLog> = state
            .access_logs
            .iter()
            .filter(|l| l.message_id == message_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.accessed_at.cmp(&a.accessed_at));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn user_access_stats(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<AccessStats> {
        let state = self.inner.read().await;
        let mut stats = AccessStats::default();
        for log in state
            .access_logs
            .iter()
            .filter(|l| l.user_id == user_id && l.accessed_at >= since)
        {
            stats.total += 1;
            if !log.granted {
                stats.denied += 1;
            }
        }
        Ok(stats)
    }

    async fn insert_incident(&self, incident: SecurityIncident) -> AppResult<()> {
        self.inner
            .write()
            .await
            .incidents
            .insert(incident.id, incident);
        Ok(())
    }

    async fn get_incident(&self, id: Uuid) -> AppResult<Option<SecurityIncident>> {
        Ok(self.inner.read().await.incidents.get(&id).cloned())
    }

    async fn resolve_incident(
        &self,
        id: Uuid,
        resolved_by: Uuid,
        summary: String,
        at: DateTime<Utc>,
    ) -> AppResult<SecurityIncident> {
        let mut state = self.inner.write().await;
        let incident = state
            .incidents
            .get_mut(&id)
            .ok_or(AppError::NotFound("security incident"))?;
        if incident.status == IncidentStatus::Resolved {
            return Err(AppError::Conflict("incident already resolved".into()));
        }
        incident.status = IncidentStatus::Resolved;
        incident.resolved_by = Some(resolved_by);
        incident.resolved_at = Some(at);
        incident.resolution_summary = Some(summary);
        Ok(incident.clone())
    }

    async fn incidents_for_user(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<SecurityIncident>> {
        Ok(self
            .inner
            .read()
            .await
            .incidents
            .values()
            .filter(|i| i.user_id == user_id && i.occurred_at >= since)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl VoiceStore for MemoryStore {
    async fn insert(&self, voice: VoiceMessage) -> AppResult<()> {
        self.inner.write().await.voice.insert(voice.id, voice);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<VoiceMessage>> {
        Ok(self.inner.read().await.voice.get(&id).cloned())
    }

    async fn update(&self, voice: VoiceMessage) -> AppResult<()> {
        let mut state = self.inner.write().await;
        if !state.voice.contains_key(&voice.id) {
            return Err(AppError::NotFound("voice message"));
        }
        state.voice.insert(voice.id, voice);
        Ok(())
    }

    async fn append_transcription(&self, transcription: VoiceTranscription) -> AppResult<()> {
        self.inner
            .write()
            .await
            .transcriptions
            .entry(transcription.voice_message_id)
            .or_default()
            .push(transcription);
        Ok(())
    }

    async fn transcriptions(&self, voice_message_id: Uuid) -> AppResult<Vec<VoiceTranscription>> {
        Ok(self
            .inner
            .read()
            .await
            .transcriptions
            .get(&voice_message_id)
            .cloned()
            .unwrap_or_default())
    }
}
