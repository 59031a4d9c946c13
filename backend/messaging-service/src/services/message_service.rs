use std::sync::Arc;

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    Conversation, Message, MessageAttachment, MessageDto, MessageType, ReadReceipt,
};
use crate::realtime::{ConversationHub, RealtimeEvent};
use crate::services::encryption::KeyVault;
use crate::services::notifier::Notifier;
use crate::services::self_destruct::SelfDestructEngine;
use crate::store::{ConversationStore, MessageStore};

#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    pub conversation_id: Uuid,
    pub kind: MessageType,
    pub content: String,
    pub reply_to_message_id: Option<Uuid>,
    pub attachments: Vec<MessageAttachment>,
}

/// Message lifecycle: content is sealed before it is stored and opened only
/// on the way out. Delivery notifications are best effort and never fail the
/// send.
pub struct MessageService {
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    vault: Arc<KeyVault>,
    destruct: Arc<SelfDestructEngine>,
    hub: Arc<ConversationHub>,
    notifier: Arc<dyn Notifier>,
}

impl MessageService {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        messages: Arc<dyn MessageStore>,
        vault: Arc<KeyVault>,
        destruct: Arc<SelfDestructEngine>,
        hub: Arc<ConversationHub>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            conversations,
            messages,
            vault,
            destruct,
            hub,
            notifier,
        }
    }

    pub async fn send_message(
        &self,
        sender_id: Uuid,
        request: SendMessageRequest,
    ) -> AppResult<MessageDto> {
        if request.content.is_empty() {
            return Err(AppError::InvalidInput("message content is empty".into()));
        }
        let conversation = self
            .require_conversation(request.conversation_id, sender_id)
            .await?;
        if conversation.is_archived {
            return Err(AppError::Conflict(
                "cannot send to an archived conversation".into(),
            ));
        }
        if let Some(reply_to) = request.reply_to_message_id {
            let parent = self
                .messages
                .get(reply_to)
                .await?
                .ok_or(AppError::NotFound("message"))?;
            if parent.conversation_id != request.conversation_id {
                return Err(AppError::InvalidInput(
                    "reply target belongs to another conversation".into(),
                ));
            }
        }

        let sealed = self
            .vault
            .seal(request.conversation_id, &request.content)
            .await?;
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: request.conversation_id,
            sender_id,
            kind: request.kind,
            key_id: sealed.key_id,
            content_encrypted: sealed.ciphertext,
            content_nonce: sealed.nonce,
            reply_to_message_id: request.reply_to_message_id,
            attachments: request.attachments,
            is_edited: false,
            last_edited_at: None,
            is_deleted: false,
            deleted_at: None,
            sent_at: Utc::now(),
        };
        self.messages.insert(message.clone()).await?;

        self.hub
            .publish(RealtimeEvent::MessageNew {
                conversation_id: message.conversation_id,
                message_id: message.id,
                sender_id,
                sent_at: message.sent_at,
            })
            .await;
        if !conversation.is_muted {
            self.fan_out_notifications(&message).await;
        }
        Ok(MessageDto::from_message(&message, request.content))
    }

    pub async fn get_message(&self, caller_id: Uuid, message_id: Uuid) -> AppResult<MessageDto> {
        let message = self.require_message(message_id).await?;
        self.require_member(message.conversation_id, caller_id)
            .await?;
        if self.destruct.check_destroyed(message_id).await? {
            return Err(AppError::MessageDestroyed);
        }
        if message.is_deleted && message.sender_id != caller_id {
            return Err(AppError::NotFound("message"));
        }
        self.open_dto(&message).await
    }

    /// Newest-first page. Destroyed messages are dropped from the page; an
    /// overdue timer is destroyed on the spot.
    pub async fn get_conversation_messages(
        &self,
        caller_id: Uuid,
        conversation_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> AppResult<Vec<MessageDto>> {
        self.require_member(conversation_id, caller_id).await?;
        let page_size = page_size.clamp(1, 100);
        let rows = self
            .messages
            .page_for_conversation(conversation_id, caller_id, page, page_size)
            .await?;
        let mut out = Vec::with_capacity(rows.len());
        for message in rows {
            if self.destruct.check_destroyed(message.id).await? {
                continue;
            }
            out.push(self.open_dto(&message).await?);
        }
        Ok(out)
    }

    /// Re-seals the new content under the current Active key.
    pub async fn edit_message(
        &self,
        caller_id: Uuid,
        message_id: Uuid,
        new_content: String,
    ) -> AppResult<MessageDto> {
        if new_content.is_empty() {
            return Err(AppError::InvalidInput("message content is empty".into()));
        }
        let mut message = self.require_message(message_id).await?;
        if message.sender_id != caller_id {
            return Err(AppError::Forbidden("only the sender may edit".into()));
        }
        if self.destruct.check_destroyed(message_id).await? {
            return Err(AppError::MessageDestroyed);
        }
        if message.is_deleted {
            return Err(AppError::Conflict("cannot edit a deleted message".into()));
        }

        let sealed = self.vault.seal(message.conversation_id, &new_content).await?;
        message.key_id = sealed.key_id;
        message.content_encrypted = sealed.ciphertext;
        message.content_nonce = sealed.nonce;
        message.is_edited = true;
        message.last_edited_at = Some(Utc::now());
        self.messages.update(message.clone()).await?;

        self.hub
            .publish(RealtimeEvent::MessageEdited {
                conversation_id: message.conversation_id,
                message_id,
                edited_at: message.last_edited_at.unwrap_or_else(Utc::now),
            })
            .await;
        Ok(MessageDto::from_message(&message, new_content))
    }

    /// Soft delete, idempotent. Ciphertext stays in place for the sender.
    pub async fn delete_message(&self, caller_id: Uuid, message_id: Uuid) -> AppResult<()> {
        let mut message = self.require_message(message_id).await?;
        if message.sender_id != caller_id {
            return Err(AppError::Forbidden("only the sender may delete".into()));
        }
        if message.is_deleted {
            return Ok(());
        }
        message.is_deleted = true;
        message.deleted_at = Some(Utc::now());
        self.messages.update(message.clone()).await?;
        self.hub
            .publish(RealtimeEvent::MessageDeleted {
                conversation_id: message.conversation_id,
                message_id,
            })
            .await;
        Ok(())
    }

    /// Idempotent. The first receipt advances the reader's watermark and
    /// emits read and unread-count events; repeats do nothing.
    pub async fn mark_as_read(
        &self,
        caller_id: Uuid,
        message_id: Uuid,
        device_info: Option<String>,
    ) -> AppResult<()> {
        let message = self.require_message(message_id).await?;
        self.require_member(message.conversation_id, caller_id)
            .await?;
        if message.sender_id == caller_id {
            return Ok(());
        }
        let receipt = ReadReceipt {
            message_id,
            user_id: caller_id,
            read_at: Utc::now(),
            device_info,
        };
        if !self.messages.mark_read(receipt).await? {
            return Ok(());
        }
        // The watermark advances to the read message's send time, so later
        // messages stay unread. The store keeps it monotonic.
        self.conversations
            .set_last_read(message.conversation_id, caller_id, message.sent_at)
            .await?;
        let unread = self
            .messages
            .unread_count(message.conversation_id, caller_id)
            .await?;
        self.hub
            .publish(RealtimeEvent::MessageRead {
                conversation_id: message.conversation_id,
                message_id,
                reader_id: caller_id,
            })
            .await;
        self.hub
            .publish(RealtimeEvent::UnreadCountUpdated {
                conversation_id: message.conversation_id,
                user_id: caller_id,
                unread_count: unread,
            })
            .await;
        Ok(())
    }

    pub async fn unread_count(&self, caller_id: Uuid, conversation_id: Uuid) -> AppResult<u64> {
        self.require_member(conversation_id, caller_id).await?;
        self.messages.unread_count(conversation_id, caller_id).await
    }

    async fn open_dto(&self, message: &Message) -> AppResult<MessageDto> {
        let content = self
            .vault
            .open(message.key_id, &message.content_nonce, &message.content_encrypted)
            .await?;
        Ok(MessageDto::from_message(message, content))
    }

    async fn fan_out_notifications(&self, message: &Message) {
        let participants = match self.conversations.participants(message.conversation_id).await {
            Ok(participants) => participants,
            Err(e) => {
                warn!(error = %e, "could not load participants for notification fan-out");
                return;
            }
        };
        for participant in participants {
            if participant.user_id == message.sender_id {
                continue;
            }
            if let Err(e) = self
                .notifier
                .notify_new_message(participant.user_id, message.conversation_id, message.sender_id)
                .await
            {
                warn!(error = %e, user_id = %participant.user_id, "message notification failed");
            }
        }
    }

    async fn require_conversation(
        &self,
        conversation_id: Uuid,
        caller_id: Uuid,
    ) -> AppResult<Conversation> {
        self.require_member(conversation_id, caller_id).await?;
        self.conversations
            .get(conversation_id)
            .await?
            .ok_or(AppError::NotFound("conversation"))
    }

    async fn require_member(&self, conversation_id: Uuid, user_id: Uuid) -> AppResult<()> {
        if self
            .conversations
            .is_participant(conversation_id, user_id)
            .await?
        {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "not a participant of this conversation".into(),
            ))
        }
    }

    async fn require_message(&self, message_id: Uuid) -> AppResult<Message> {
        self.messages
            .get(message_id)
            .await?
            .ok_or(AppError::NotFound("message"))
    }
}
