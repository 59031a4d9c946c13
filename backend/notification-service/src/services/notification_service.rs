use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{NotifyError, NotifyResult};
use crate::models::{
    BulkFailure, BulkSendReport, DeviceSettings, NotificationDevice, NotificationStatus, Platform,
    PushNotification, ScheduledNotification, SendNotificationRequest,
};
use crate::services::gateway::{PushGateway, PushOutcome};
use crate::store::{DeviceStore, NotificationStore};

/// Device registry and notification fan-out.
///
/// One logical send produces exactly one durable [`PushNotification`] record
/// no matter how many devices it reaches. Quiet hours suppress delivery per
/// device; a send where every device was quiet is recorded as Suppressed.
pub struct NotificationService {
    devices: Arc<dyn DeviceStore>,
    notifications: Arc<dyn NotificationStore>,
    gateway: Arc<dyn PushGateway>,
}

impl NotificationService {
    pub fn new(store: Arc<crate::store::MemoryStore>, gateway: Arc<dyn PushGateway>) -> Self {
        Self {
            devices: store.clone(),
            notifications: store,
            gateway,
        }
    }

    pub fn with_stores(
        devices: Arc<dyn DeviceStore>,
        notifications: Arc<dyn NotificationStore>,
        gateway: Arc<dyn PushGateway>,
    ) -> Self {
        Self {
            devices,
            notifications,
            gateway,
        }
    }

    /// Registering an already-known token updates it in place; a device
    /// switching accounts moves to the new user.
    pub async fn register_device(
        &self,
        user_id: Uuid,
        token: String,
        platform: Platform,
        device_name: Option<String>,
    ) -> NotifyResult<NotificationDevice> {
        if token.is_empty() {
            return Err(NotifyError::InvalidInput("device token is empty".into()));
        }
        let device = NotificationDevice::new(user_id, token, platform, device_name);
        let device = self.devices.upsert_by_token(device).await?;
        info!(user_id = %device.user_id, platform = device.platform.as_str(), "device registered");
        Ok(device)
    }

    /// Idempotent soft deactivation.
    pub async fn unregister_device(&self, user_id: Uuid, token: &str) -> NotifyResult<bool> {
        self.devices.deactivate(user_id, token).await
    }

    pub async fn get_user_devices(&self, user_id: Uuid) -> NotifyResult<Vec<NotificationDevice>> {
        self.devices.active_for_user(user_id).await
    }

    pub async fn update_device_settings(
        &self,
        user_id: Uuid,
        token: &str,
        settings: DeviceSettings,
    ) -> NotifyResult<NotificationDevice> {
        let devices = self.devices.active_for_user(user_id).await?;
        let mut device = devices
            .into_iter()
            .find(|d| d.token == token)
            .ok_or(NotifyError::NotFound("device"))?;
        device.settings = settings;
        self.devices.upsert_by_token(device.clone()).await?;
        Ok(device)
    }

    /// Fans one notification out to the user's active devices and records
    /// the logical send. Fails only when the user has no active devices at
    /// all; individual gateway rejections are tallied, not raised.
    pub async fn send_notification(
        &self,
        request: SendNotificationRequest,
    ) -> NotifyResult<PushNotification> {
        if request.title.is_empty() {
            return Err(NotifyError::InvalidInput("title is empty".into()));
        }
        let devices = self.devices.active_for_user(request.user_id).await?;
        if devices.is_empty() {
            return Err(NotifyError::NoActiveDevices);
        }

        let now_local = Utc::now().time();
        let eligible: Vec<&NotificationDevice> = devices
            .iter()
            .filter(|d| d.settings.notifications_enabled)
            .filter(|d| {
                d.settings
                    .quiet_hours
                    .map(|q| !q.contains(now_local))
                    .unwrap_or(true)
            })
            .collect();

        let mut delivered = 0u32;
        let mut last_failure = None;
        for device in &eligible {
            match self.gateway.push(device, &request).await {
                Ok(PushOutcome::Delivered) => delivered += 1,
                Ok(PushOutcome::Rejected) => {
                    last_failure = Some("rejected by gateway".to_string());
                }
                Err(e) => {
                    warn!(error = %e, user_id = %request.user_id, "push attempt failed");
                    last_failure = Some(e.to_string());
                }
            }
        }

        let status = if eligible.is_empty() {
            NotificationStatus::Suppressed
        } else if delivered > 0 {
            NotificationStatus::Sent
        } else {
            NotificationStatus::Failed
        };
        let notification = PushNotification {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            title: request.title,
            body: request.body,
            data: request.data,
            status,
            devices_attempted: eligible.len() as u32,
            devices_delivered: delivered,
            failure_reason: if status == NotificationStatus::Failed {
                last_failure
            } else {
                None
            },
            created_at: Utc::now(),
            read_at: None,
        };
        self.notifications.insert(notification.clone()).await?;
        Ok(notification)
    }

    /// Continues past individual failures and reports them per recipient.
    pub async fn send_bulk(
        &self,
        requests: Vec<SendNotificationRequest>,
    ) -> NotifyResult<BulkSendReport> {
        let mut report = BulkSendReport {
            requested: requests.len() as u32,
            ..Default::default()
        };
        for request in requests {
            let user_id = request.user_id;
            match self.send_notification(request).await {
                Ok(_) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    report.failures.push(BulkFailure {
                        user_id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// Never delivers synchronously; a past `deliver_at` is picked up by the
    /// next sweep.
    pub async fn schedule_notification(
        &self,
        request: SendNotificationRequest,
        deliver_at: DateTime<Utc>,
    ) -> NotifyResult<ScheduledNotification> {
        if request.title.is_empty() {
            return Err(NotifyError::InvalidInput("title is empty".into()));
        }
        let scheduled = ScheduledNotification {
            id: Uuid::new_v4(),
            request,
            deliver_at,
            delivered: false,
            delivered_at: None,
            created_at: Utc::now(),
        };
        self.notifications.insert_scheduled(scheduled.clone()).await?;
        Ok(scheduled)
    }

    /// Delivers every due scheduled notification. Returns how many were
    /// processed in this pass.
    pub async fn process_scheduled(&self) -> NotifyResult<usize> {
        let now = Utc::now();
        let due = self.notifications.due_scheduled(now).await?;
        let mut processed = 0;
        for scheduled in due {
            if !self.notifications.mark_delivered(scheduled.id, now).await? {
                continue;
            }
            processed += 1;
            if let Err(e) = self.send_notification(scheduled.request.clone()).await {
                warn!(error = %e, user_id = %scheduled.request.user_id, "scheduled delivery failed");
            }
        }
        if processed > 0 {
            info!(processed, "scheduled notification sweep completed");
        }
        Ok(processed)
    }

    pub fn spawn_scheduler(self: Arc<Self>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
            loop {
                ticker.tick().await;
                if let Err(e) = self.process_scheduled().await {
                    warn!(error = %e, "scheduled notification sweep failed");
                }
            }
        })
    }

    pub async fn list_notifications(&self, user_id: Uuid) -> NotifyResult<Vec<PushNotification>> {
        self.notifications.list_for_user(user_id).await
    }

    /// Idempotent; the second call is a no-op.
    pub async fn mark_read(&self, id: Uuid, user_id: Uuid) -> NotifyResult<bool> {
        self.notifications.mark_read(id, user_id, Utc::now()).await
    }
}
