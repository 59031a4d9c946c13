use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    Conversation, ConversationParticipant, ConversationType, MemberRole,
};
use crate::realtime::{ConversationHub, RealtimeEvent};
use crate::store::ConversationStore;

pub struct ConversationService {
    store: Arc<dyn ConversationStore>,
    hub: Arc<ConversationHub>,
}

impl ConversationService {
    pub fn new(store: Arc<dyn ConversationStore>, hub: Arc<ConversationHub>) -> Self {
        Self { store, hub }
    }

    /// Creates a conversation with the creator as Admin. The creator is
    /// merged into `participant_ids` and duplicates are dropped. A Direct
    /// conversation must end up with exactly two members; a group only needs
    /// the creator, but the input list itself must not be empty.
    pub async fn create_conversation(
        &self,
        creator_id: Uuid,
        kind: ConversationType,
        name: Option<String>,
        participant_ids: Vec<Uuid>,
    ) -> AppResult<Conversation> {
        if participant_ids.is_empty() {
            return Err(AppError::InvalidInput("participant list is empty".into()));
        }
        let mut members = vec![creator_id];
        for id in participant_ids {
            if !members.contains(&id) {
                members.push(id);
            }
        }
        if kind == ConversationType::Direct && members.len() != 2 {
            return Err(AppError::InvalidInput(
                "a direct conversation requires exactly two participants".into(),
            ));
        }

        let conversation = Conversation::new(kind, name, creator_id);
        let participants = members
            .into_iter()
            .map(|user_id| {
                let role = if user_id == creator_id {
                    MemberRole::Admin
                } else {
                    MemberRole::Member
                };
                ConversationParticipant::new(conversation.id, user_id, role)
            })
            .collect();
        self.store.insert(conversation.clone(), participants).await?;
        info!(conversation_id = %conversation.id, kind = kind.as_str(), "created conversation");
        Ok(conversation)
    }

    pub async fn get_conversation(
        &self,
        caller_id: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<Conversation> {
        self.require_member(conversation_id, caller_id).await?;
        self.store
            .get(conversation_id)
            .await?
            .ok_or(AppError::NotFound("conversation"))
    }

    pub async fn list_conversations(&self, caller_id: Uuid) -> AppResult<Vec<Conversation>> {
        self.store.list_for_user(caller_id).await
    }

    pub async fn participants(
        &self,
        caller_id: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<Vec<ConversationParticipant>> {
        self.require_member(conversation_id, caller_id).await?;
        self.store.participants(conversation_id).await
    }

    /// Admin-only for groups; a Direct conversation never grows.
    pub async fn add_participant(
        &self,
        caller_id: Uuid,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<()> {
        let conversation = self.get_conversation(caller_id, conversation_id).await?;
        if conversation.kind == ConversationType::Direct {
            return Err(AppError::Conflict(
                "cannot add participants to a direct conversation".into(),
            ));
        }
        self.require_admin(conversation_id, caller_id).await?;
        self.store
            .add_participant(ConversationParticipant::new(
                conversation_id,
                user_id,
                MemberRole::Member,
            ))
            .await?;
        self.hub
            .publish(RealtimeEvent::ParticipantJoined {
                conversation_id,
                user_id,
            })
            .await;
        Ok(())
    }

    /// Members may remove themselves; removing anyone else requires Admin.
    /// The store rejects a removal that would leave no admin behind.
    pub async fn remove_participant(
        &self,
        caller_id: Uuid,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<()> {
        self.require_member(conversation_id, caller_id).await?;
        if caller_id != user_id {
            self.require_admin(conversation_id, caller_id).await?;
        }
        self.store
            .remove_participant(conversation_id, user_id)
            .await?;
        self.hub
            .publish(RealtimeEvent::ParticipantLeft {
                conversation_id,
                user_id,
            })
            .await;
        Ok(())
    }

    /// Admin-only. Demoting the last admin fails with a conflict.
    pub async fn change_role(
        &self,
        caller_id: Uuid,
        conversation_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> AppResult<()> {
        self.require_admin(conversation_id, caller_id).await?;
        self.store.change_role(conversation_id, user_id, role).await
    }

    /// Admin-only metadata update. Currently covers the display name.
    pub async fn update_conversation(
        &self,
        caller_id: Uuid,
        conversation_id: Uuid,
        name: Option<String>,
    ) -> AppResult<Conversation> {
        self.require_admin(conversation_id, caller_id).await?;
        let mut conversation = self
            .store
            .get(conversation_id)
            .await?
            .ok_or(AppError::NotFound("conversation"))?;
        if let Some(name) = name {
            if name.trim().is_empty() {
                return Err(AppError::InvalidInput("conversation name is empty".into()));
            }
            conversation.name = Some(name);
            conversation.updated_at = Utc::now();
            self.store.update(conversation.clone()).await?;
        }
        Ok(conversation)
    }

    /// Admin-only and idempotent: archiving an archived conversation is a
    /// no-op.
    pub async fn archive(&self, caller_id: Uuid, conversation_id: Uuid) -> AppResult<Conversation> {
        self.require_admin(conversation_id, caller_id).await?;
        let mut conversation = self.get_conversation(caller_id, conversation_id).await?;
        if !conversation.is_archived {
            conversation.is_archived = true;
            conversation.archived_at = Some(Utc::now());
            conversation.updated_at = Utc::now();
            self.store.update(conversation.clone()).await?;
        }
        Ok(conversation)
    }

    pub async fn unarchive(
        &self,
        caller_id: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<Conversation> {
        self.require_admin(conversation_id, caller_id).await?;
        let mut conversation = self.get_conversation(caller_id, conversation_id).await?;
        if conversation.is_archived {
            conversation.is_archived = false;
            conversation.archived_at = None;
            conversation.updated_at = Utc::now();
            self.store.update(conversation.clone()).await?;
        }
        Ok(conversation)
    }

    pub async fn set_pinned(
        &self,
        caller_id: Uuid,
        conversation_id: Uuid,
        pinned: bool,
    ) -> AppResult<Conversation> {
        let mut conversation = self.get_conversation(caller_id, conversation_id).await?;
        if conversation.is_pinned != pinned {
            conversation.is_pinned = pinned;
            conversation.updated_at = Utc::now();
            self.store.update(conversation.clone()).await?;
        }
        Ok(conversation)
    }

    pub async fn set_muted(
        &self,
        caller_id: Uuid,
        conversation_id: Uuid,
        muted: bool,
    ) -> AppResult<Conversation> {
        let mut conversation = self.get_conversation(caller_id, conversation_id).await?;
        if conversation.is_muted != muted {
            conversation.is_muted = muted;
            conversation.updated_at = Utc::now();
            self.store.update(conversation.clone()).await?;
        }
        Ok(conversation)
    }

    async fn require_member(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<()> {
        if self.store.is_participant(conversation_id, user_id).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "not a participant of this conversation".into(),
            ))
        }
    }

    async fn require_admin(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let participants = self.store.participants(conversation_id).await?;
        let is_admin = participants
            .iter()
            .any(|p| p.user_id == user_id && p.role == MemberRole::Admin);
        if is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("admin role required".into()))
        }
    }
}
