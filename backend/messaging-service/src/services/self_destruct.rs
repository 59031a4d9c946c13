use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{DestructMode, Message, MessageViewRecord, SelfDestructPolicy};
use crate::realtime::{ConversationHub, RealtimeEvent};
use crate::services::notifier::Notifier;
use crate::store::{ConversationStore, MessageStore, PolicyStore, ViewOutcome};

/// Parameters for configuring a destruct policy on a message.
#[derive(Debug, Clone)]
pub struct DestructRequest {
    pub mode: DestructMode,
    pub timer_seconds: Option<i64>,
    pub max_views: Option<u32>,
    pub notify_on_destruction: bool,
}

/// Owns the lifecycle of self-destructing messages.
///
/// Timer policies are enforced twice: lazily, on every read path through
/// [`SelfDestructEngine::check_destroyed`], and proactively by the reaper
/// sweep. View policies destroy through the store's atomic
/// increment-and-compare, so the limit-reaching view triggers destruction
/// exactly once under any concurrency.
pub struct SelfDestructEngine {
    policies: Arc<dyn PolicyStore>,
    messages: Arc<dyn MessageStore>,
    conversations: Arc<dyn ConversationStore>,
    hub: Arc<ConversationHub>,
    notifier: Arc<dyn Notifier>,
}

impl SelfDestructEngine {
    pub fn new(
        policies: Arc<dyn PolicyStore>,
        messages: Arc<dyn MessageStore>,
        conversations: Arc<dyn ConversationStore>,
        hub: Arc<ConversationHub>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            policies,
            messages,
            conversations,
            hub,
            notifier,
        }
    }

    /// Only the sender may configure destruction. Reconfiguring a pending
    /// policy replaces it and resets the view count; a destroyed message can
    /// never be reconfigured.
    pub async fn configure(
        &self,
        caller_id: Uuid,
        message_id: Uuid,
        request: DestructRequest,
    ) -> AppResult<SelfDestructPolicy> {
        let message = self.require_message(message_id).await?;
        if message.sender_id != caller_id {
            return Err(AppError::Forbidden(
                "only the sender may configure self-destruction".into(),
            ));
        }
        if let Some(existing) = self.policies.get(message_id).await? {
            if existing.is_destroyed {
                return Err(AppError::MessageDestroyed);
            }
        }
        let policy = match request.mode {
            DestructMode::Timer => {
                // Zero is valid: the message is overdue the moment the policy
                // lands, so the first view already finds it destroyed.
                let secs = request
                    .timer_seconds
                    .filter(|s| *s >= 0)
                    .ok_or_else(|| {
                        AppError::InvalidInput("timer_seconds must not be negative".into())
                    })?;
                SelfDestructPolicy::timer(message_id, caller_id, secs, request.notify_on_destruction)
            }
            DestructMode::ViewBased => {
                let max = request
                    .max_views
                    .filter(|v| *v >= 1)
                    .ok_or_else(|| AppError::InvalidInput("max_views must be at least 1".into()))?;
                SelfDestructPolicy::view_based(
                    message_id,
                    caller_id,
                    max,
                    request.notify_on_destruction,
                )
            }
        };
        self.policies.upsert(policy.clone()).await?;
        info!(%message_id, mode = ?policy.mode, "configured self-destruct policy");
        Ok(policy)
    }

    pub async fn policy(&self, message_id: Uuid) -> AppResult<Option<SelfDestructPolicy>> {
        self.policies.get(message_id).await
    }

    /// Counts one view. Fails with `MessageDestroyed` when the message is
    /// already gone, including a timer that elapsed since the last sweep.
    /// Returns `None` for messages without a destruct policy.
    pub async fn record_view(
        &self,
        viewer_id: Uuid,
        message_id: Uuid,
        view_duration_ms: Option<i64>,
        client: Option<crate::models::ClientInfo>,
    ) -> AppResult<Option<ViewOutcome>> {
        let Some(policy) = self.policies.get(message_id).await? else {
            return Ok(None);
        };
        if policy.is_destroyed || self.lazy_timer_destruct(&policy).await? {
            return Err(AppError::MessageDestroyed);
        }
        let view = MessageViewRecord {
            message_id,
            viewer_id,
            viewed_at: Utc::now(),
            view_duration_ms,
            client,
        };
        let outcome = self.policies.record_view(message_id, view).await?;
        if outcome.already_destroyed {
            return Err(AppError::MessageDestroyed);
        }
        if outcome.destroyed_now {
            self.after_destruction(message_id, "view limit reached").await;
        }
        Ok(Some(outcome))
    }

    /// Manual destruction by the sender. Destroying an already-destroyed
    /// message succeeds without side effects.
    pub async fn trigger(&self, caller_id: Uuid, message_id: Uuid, reason: &str) -> AppResult<()> {
        let message = self.require_message(message_id).await?;
        if message.sender_id != caller_id {
            return Err(AppError::Forbidden(
                "only the sender may destroy the message".into(),
            ));
        }
        if self.policies.get(message_id).await?.is_none() {
            return Err(AppError::NotFound("self-destruct policy"));
        }
        if self.policies.destroy(message_id, reason, Utc::now()).await? {
            self.after_destruction(message_id, reason).await;
        }
        Ok(())
    }

    /// Cancels a pending policy. Returns false when none was configured.
    pub async fn cancel(&self, caller_id: Uuid, message_id: Uuid) -> AppResult<bool> {
        let message = self.require_message(message_id).await?;
        if message.sender_id != caller_id {
            return Err(AppError::Forbidden(
                "only the sender may cancel self-destruction".into(),
            ));
        }
        if let Some(policy) = self.policies.get(message_id).await? {
            if policy.is_destroyed {
                return Err(AppError::Conflict(
                    "message has already been destroyed".into(),
                ));
            }
        }
        self.policies.remove(message_id).await
    }

    /// Lazy read-path check: destroys an overdue timer message on the spot.
    pub async fn check_destroyed(&self, message_id: Uuid) -> AppResult<bool> {
        match self.policies.get(message_id).await? {
            None => Ok(false),
            Some(policy) if policy.is_destroyed => Ok(true),
            Some(policy) => self.lazy_timer_destruct(&policy).await,
        }
    }

    pub async fn views(&self, message_id: Uuid) -> AppResult<Vec<MessageViewRecord>> {
        self.policies.views(message_id).await
    }

    /// Destroys every timer policy whose deadline has passed. Returns the
    /// number destroyed in this pass.
    pub async fn sweep(&self) -> AppResult<usize> {
        let now = Utc::now();
        let due = self.policies.due_for_destruction(now).await?;
        let mut destroyed = 0;
        for policy in due {
            if self
                .policies
                .destroy(policy.message_id, "timer expired", now)
                .await?
            {
                destroyed += 1;
                self.after_destruction(policy.message_id, "timer expired")
                    .await;
            }
        }
        if destroyed > 0 {
            info!(destroyed, "self-destruct sweep completed");
        }
        Ok(destroyed)
    }

    /// Background reaper so timer messages disappear even when nobody reads.
    pub fn spawn_reaper(self: Arc<Self>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep().await {
                    warn!(error = %e, "self-destruct sweep failed");
                }
            }
        })
    }

    async fn lazy_timer_destruct(&self, policy: &SelfDestructPolicy) -> AppResult<bool> {
        let now = Utc::now();
        if policy.mode == DestructMode::Timer && policy.timer_elapsed(now) {
            if self
                .policies
                .destroy(policy.message_id, "timer expired", now)
                .await?
            {
                self.after_destruction(policy.message_id, "timer expired")
                    .await;
            }
            return Ok(true);
        }
        Ok(false)
    }

    async fn after_destruction(&self, message_id: Uuid, reason: &str) {
        let Ok(Some(message)) = self.messages.get(message_id).await else {
            return;
        };
        self.hub
            .publish(RealtimeEvent::MessageDestroyed {
                conversation_id: message.conversation_id,
                message_id,
                reason: reason.to_string(),
            })
            .await;
        let notify = match self.policies.get(message_id).await {
            Ok(Some(policy)) => policy.notify_on_destruction,
            _ => false,
        };
        if notify {
            match self.conversations.participants(message.conversation_id).await {
                Ok(participants) => {
                    for participant in participants {
                        if let Err(e) = self
                            .notifier
                            .notify_destruction(participant.user_id, message_id)
                            .await
                        {
                            warn!(error = %e, user_id = %participant.user_id, "destruction notification failed");
                        }
                    }
                }
                Err(e) => warn!(error = %e, "could not load participants for destruction notice"),
            }
        }
    }

    async fn require_message(&self, message_id: Uuid) -> AppResult<Message> {
        self.messages
            .get(message_id)
            .await?
            .ok_or(AppError::NotFound("message"))
    }
}
