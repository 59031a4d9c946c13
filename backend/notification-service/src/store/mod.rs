//! Storage ports for devices and notification records. The bundled
//! [`MemoryStore`] keeps everything behind one async lock.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::NotifyResult;
use crate::models::{NotificationDevice, PushNotification, ScheduledNotification};

#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Token-keyed upsert: an existing token is updated and reactivated in
    /// place, never duplicated.
    async fn upsert_by_token(&self, device: NotificationDevice) -> NotifyResult<NotificationDevice>;
    /// Soft deactivation. Returns false when no matching active device exists.
    async fn deactivate(&self, user_id: Uuid, token: &str) -> NotifyResult<bool>;
    async fn active_for_user(&self, user_id: Uuid) -> NotifyResult<Vec<NotificationDevice>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: PushNotification) -> NotifyResult<()>;
    async fn get(&self, id: Uuid) -> NotifyResult<Option<PushNotification>>;
    async fn list_for_user(&self, user_id: Uuid) -> NotifyResult<Vec<PushNotification>>;
    /// Idempotent; returns false when the notification was already read.
    async fn mark_read(&self, id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> NotifyResult<bool>;
    async fn insert_scheduled(&self, scheduled: ScheduledNotification) -> NotifyResult<()>;
    async fn due_scheduled(&self, before: DateTime<Utc>)
        -> NotifyResult<Vec<ScheduledNotification>>;
    /// One-way; returns false when already delivered.
    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> NotifyResult<bool>;
}
