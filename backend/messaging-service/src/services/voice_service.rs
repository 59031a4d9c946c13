use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{VoiceMessage, VoiceStatus, VoiceTranscription};
use crate::store::{ConversationStore, VoiceStore};

/// Speech-to-text seam. The core never processes audio itself.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_ref: &str) -> AppResult<(String, f32)>;
}

/// Default backend when no speech vendor is wired in.
#[derive(Default)]
pub struct UnconfiguredTranscriber;

#[async_trait]
impl Transcriber for UnconfiguredTranscriber {
    async fn transcribe(&self, _audio_ref: &str) -> AppResult<(String, f32)> {
        Err(AppError::DeliveryFailed(
            "no transcription backend configured".into(),
        ))
    }
}

/// Voice message lifecycle: Recording, then Completed or Cancelled.
/// Transcription is available for completed messages only.
pub struct VoiceService {
    store: Arc<dyn VoiceStore>,
    conversations: Arc<dyn ConversationStore>,
    transcriber: Arc<dyn Transcriber>,
}

impl VoiceService {
    pub fn new(
        store: Arc<dyn VoiceStore>,
        conversations: Arc<dyn ConversationStore>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        Self {
            store,
            conversations,
            transcriber,
        }
    }

    pub async fn start_recording(
        &self,
        sender_id: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<VoiceMessage> {
        if !self
            .conversations
            .is_participant(conversation_id, sender_id)
            .await?
        {
            return Err(AppError::Forbidden(
                "not a participant of this conversation".into(),
            ));
        }
        let voice = VoiceMessage::start(conversation_id, sender_id);
        self.store.insert(voice.clone()).await?;
        Ok(voice)
    }

    pub async fn complete_recording(
        &self,
        sender_id: Uuid,
        voice_message_id: Uuid,
        duration_ms: i64,
        audio_ref: String,
    ) -> AppResult<VoiceMessage> {
        let mut voice = self.require_own(sender_id, voice_message_id).await?;
        if voice.status != VoiceStatus::Recording {
            return Err(AppError::Conflict("recording is no longer active".into()));
        }
        if duration_ms <= 0 {
            return Err(AppError::InvalidInput("duration must be positive".into()));
        }
        voice.status = VoiceStatus::Completed;
        voice.duration_ms = Some(duration_ms);
        voice.audio_ref = Some(audio_ref);
        voice.completed_at = Some(Utc::now());
        self.store.update(voice.clone()).await?;
        Ok(voice)
    }

    /// Idempotent: cancelling a cancelled recording is a no-op; a completed
    /// one conflicts.
    pub async fn cancel_recording(
        &self,
        sender_id: Uuid,
        voice_message_id: Uuid,
    ) -> AppResult<VoiceMessage> {
        let mut voice = self.require_own(sender_id, voice_message_id).await?;
        match voice.status {
            VoiceStatus::Cancelled => Ok(voice),
            VoiceStatus::Completed => Err(AppError::Conflict(
                "cannot cancel a completed recording".into(),
            )),
            VoiceStatus::Recording => {
                voice.status = VoiceStatus::Cancelled;
                voice.completed_at = Some(Utc::now());
                self.store.update(voice.clone()).await?;
                Ok(voice)
            }
        }
    }

    pub async fn get_voice_message(
        &self,
        caller_id: Uuid,
        voice_message_id: Uuid,
    ) -> AppResult<VoiceMessage> {
        let voice = self
            .store
            .get(voice_message_id)
            .await?
            .ok_or(AppError::NotFound("voice message"))?;
        if !self
            .conversations
            .is_participant(voice.conversation_id, caller_id)
            .await?
        {
            return Err(AppError::Forbidden(
                "not a participant of this conversation".into(),
            ));
        }
        Ok(voice)
    }

    pub async fn request_transcription(
        &self,
        caller_id: Uuid,
        voice_message_id: Uuid,
    ) -> AppResult<VoiceTranscription> {
        let voice = self.get_voice_message(caller_id, voice_message_id).await?;
        if voice.status != VoiceStatus::Completed {
            return Err(AppError::Conflict(
                "only completed recordings can be transcribed".into(),
            ));
        }
        let audio_ref = voice
            .audio_ref
            .as_deref()
            .ok_or(AppError::NotFound("audio"))?;
        let (transcript, confidence) = self.transcriber.transcribe(audio_ref).await?;
        let transcription = VoiceTranscription {
            id: Uuid::new_v4(),
            voice_message_id,
            transcript,
            confidence,
            created_at: Utc::now(),
        };
        self.store
            .append_transcription(transcription.clone())
            .await?;
        Ok(transcription)
    }

    /// Any participant may play a completed recording; each playback bumps
    /// the counter and the last-played timestamp.
    pub async fn record_playback(
        &self,
        caller_id: Uuid,
        voice_message_id: Uuid,
    ) -> AppResult<VoiceMessage> {
        let mut voice = self.get_voice_message(caller_id, voice_message_id).await?;
        if voice.status != VoiceStatus::Completed {
            return Err(AppError::Conflict(
                "only completed recordings can be played".into(),
            ));
        }
        voice.play_count += 1;
        voice.last_played_at = Some(Utc::now());
        self.store.update(voice.clone()).await?;
        Ok(voice)
    }

    pub async fn transcriptions(
        &self,
        caller_id: Uuid,
        voice_message_id: Uuid,
    ) -> AppResult<Vec<VoiceTranscription>> {
        self.get_voice_message(caller_id, voice_message_id).await?;
        self.store.transcriptions(voice_message_id).await
    }

    async fn require_own(&self, sender_id: Uuid, voice_message_id: Uuid) -> AppResult<VoiceMessage> {
        let voice = self
            .store
            .get(voice_message_id)
            .await?
            .ok_or(AppError::NotFound("voice message"))?;
        if voice.sender_id != sender_id {
            return Err(AppError::Forbidden(
                "only the sender may modify the recording".into(),
            ));
        }
        Ok(voice)
    }
}
