use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{NotifyError, NotifyResult};
use crate::models::{
    NotificationDevice, NotificationStatus, PushNotification, ScheduledNotification,
};

use super::{DeviceStore, NotificationStore};

#[derive(Default)]
struct State {
    devices: HashMap<String, NotificationDevice>,
    notifications: HashMap<Uuid, PushNotification>,
    scheduled: HashMap<Uuid, ScheduledNotification>,
}

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
impl DeviceStore for MemoryStore {
    async fn upsert_by_token(
        &self,
        device: NotificationDevice,
    ) -> NotifyResult<NotificationDevice> {
        let mut state = self.inner.write().await;
        let row = match state.devices.get_mut(&device.token) {
            Some(existing) => {
                existing.user_id = device.user_id;
                existing.platform = device.platform;
                existing.device_name = device.device_name;
                existing.settings = device.settings;
                existing.is_active = true;
                existing.last_seen_at = Utc::now();
                existing.clone()
            }
            None => {
                state.devices.insert(device.token.clone(), device.clone());
                device
            }
        };
        Ok(row)
    }

    async fn deactivate(&self, user_id: Uuid, token: &str) -> NotifyResult<bool> {
        let mut state = self.inner.write().await;
        match state.devices.get_mut(token) {
            Some(device) if device.user_id == user_id && device.is_active => {
                device.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn active_for_user(&self, user_id: Uuid) -> NotifyResult<Vec<NotificationDevice>> {
        Ok(self
            .inner
            .read()
            .await
            .devices
            .values()
            .filter(|d| d.user_id == user_id && d.is_active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert(&self, notification: PushNotification) -> NotifyResult<()> {
        self.inner
            .write()
            .await
            .notifications
            .insert(notification.id, notification);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> NotifyResult<Option<PushNotification>> {
        Ok(self.inner.read().await.notifications.get(&id).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> NotifyResult<Vec<PushNotification>> {
        let mut rows: Vec<PushNotification> = self
            .inner
            .read()
            .await
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> NotifyResult<bool> {
        let mut state = self.inner.write().await;
        let notification = state
            .notifications
            .get_mut(&id)
            .ok_or(NotifyError::NotFound("notification"))?;
        if notification.user_id != user_id {
            return Err(NotifyError::NotFound("notification"));
        }
        if notification.status == NotificationStatus::Read {
            return Ok(false);
        }
        notification.status = NotificationStatus::Read;
        notification.read_at = Some(at);
        Ok(true)
    }

    async fn insert_scheduled(&self, scheduled: ScheduledNotification) -> NotifyResult<()> {
        self.inner
            .write()
            .await
            .scheduled
            .insert(scheduled.id, scheduled);
        Ok(())
    }

    async fn due_scheduled(
        &self,
        before: DateTime<Utc>,
    ) -> NotifyResult<Vec<ScheduledNotification>> {
        Ok(self
            .inner
            .read()
            .await
            .scheduled
            .values()
            .filter(|s| !s.delivered && s.deliver_at <= before)
            .cloned()
            .collect())
    }

    async fn mark_delivered(&self, id: Uuid, at: DateTime<Utc>) -> NotifyResult<bool> {
        let mut state = self.inner.write().await;
        let scheduled = state
            .scheduled
            .get_mut(&id)
            .ok_or(NotifyError::NotFound("scheduled notification"))?;
        if scheduled.delivered {
            return Ok(false);
        }
        scheduled.delivered = true;
        scheduled.delivered_at = Some(at);
        Ok(true)
    }
}
