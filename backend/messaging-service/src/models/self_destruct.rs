use super::security::ClientInfo;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestructMode {
    Timer,
    ViewBased,
}

/// Destruct policy, 1:1 with a message. `is_destroyed` is a one-way
/// transition; once set, reads fail regardless of stored ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfDestructPolicy {
    pub message_id: Uuid,
    pub set_by_user_id: Uuid,
    pub mode: DestructMode,
    pub timer_seconds: Option<i64>,
    pub max_views: Option<u32>,
    pub view_count: u32,
    pub notify_on_destruction: bool,
    pub is_destroyed: bool,
    pub destroyed_at: Option<DateTime<Utc>>,
    pub destruction_reason: Option<String>,
    pub configured_at: DateTime<Utc>,
}

impl SelfDestructPolicy {
    pub fn timer(message_id: Uuid, set_by: Uuid, timer_seconds: i64, notify: bool) -> Self {
        Self {
            message_id,
            set_by_user_id: set_by,
            mode: DestructMode::Timer,
            timer_seconds: Some(timer_seconds),
            max_views: None,
            view_count: 0,
            notify_on_destruction: notify,
            is_destroyed: false,
            destroyed_at: None,
            destruction_reason: None,
            configured_at: Utc::now(),
        }
    }

    pub fn view_based(message_id: Uuid, set_by: Uuid, max_views: u32, notify: bool) -> Self {
        Self {
            message_id,
            set_by_user_id: set_by,
            mode: DestructMode::ViewBased,
            timer_seconds: None,
            max_views: Some(max_views),
            view_count: 0,
            notify_on_destruction: notify,
            is_destroyed: false,
            destroyed_at: None,
            destruction_reason: None,
            configured_at: Utc::now(),
        }
    }

    /// Instant at which a timer-mode policy becomes eligible for destruction.
    pub fn destruct_at(&self) -> Option<DateTime<Utc>> {
        match self.mode {
            DestructMode::Timer => self
                .timer_seconds
                .map(|secs| self.configured_at + Duration::seconds(secs)),
            DestructMode::ViewBased => None,
        }
    }

    pub fn timer_elapsed(&self, now: DateTime<Utc>) -> bool {
        matches!(self.destruct_at(), Some(at) if now >= at)
    }
}

/// Audit row recorded for every counted view of a self-destructing message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageViewRecord {
    pub message_id: Uuid,
    pub viewer_id: Uuid,
    pub viewed_at: DateTime<Utc>,
    pub view_duration_ms: Option<i64>,
    pub client: Option<ClientInfo>,
}
