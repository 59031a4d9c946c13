use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recording → (Completed | Cancelled), terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceStatus {
    Recording,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub status: VoiceStatus,
    pub duration_ms: Option<i64>,
    /// Reference to the stored audio (object key or URL); the core never
    /// holds the bytes.
    pub audio_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub play_count: u32,
    pub last_played_at: Option<DateTime<Utc>>,
}

impl VoiceMessage {
    pub fn start(conversation_id: Uuid, sender_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            status: VoiceStatus::Recording,
            duration_ms: None,
            audio_ref: None,
            created_at: Utc::now(),
            completed_at: None,
            play_count: 0,
            last_played_at: None,
        }
    }
}

/// Append-only; a voice message may accumulate several transcriptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceTranscription {
    pub id: Uuid,
    pub voice_message_id: Uuid,
    pub transcript: String,
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
}
