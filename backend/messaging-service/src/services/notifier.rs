use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Outbound notification seam. Messaging logic never blocks on delivery;
/// failures are logged by the caller and the message flow proceeds.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_new_message(
        &self,
        recipient_id: Uuid,
        conversation_id: Uuid,
        sender_id: Uuid,
    ) -> AppResult<()>;

    async fn notify_destruction(&self, recipient_id: Uuid, message_id: Uuid) -> AppResult<()>;
}

/// No-op notifier for tests and fully in-process deployments.
#[derive(Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify_new_message(&self, _: Uuid, _: Uuid, _: Uuid) -> AppResult<()> {
        Ok(())
    }

    async fn notify_destruction(&self, _: Uuid, _: Uuid) -> AppResult<()> {
        Ok(())
    }
}

/// Adapter over the notification service's device fan-out.
pub struct PushNotifier {
    notifications: Arc<notification_service::services::NotificationService>,
}

impl PushNotifier {
    pub fn new(notifications: Arc<notification_service::services::NotificationService>) -> Self {
        Self { notifications }
    }
}

#[async_trait]
impl Notifier for PushNotifier {
    async fn notify_new_message(
        &self,
        recipient_id: Uuid,
        conversation_id: Uuid,
        sender_id: Uuid,
    ) -> AppResult<()> {
        let request = notification_service::models::SendNotificationRequest {
            user_id: recipient_id,
            title: "New message".to_string(),
            body: "You have a new encrypted message".to_string(),
            data: serde_json::json!({
                "conversation_id": conversation_id,
                "sender_id": sender_id,
            }),
        };
        self.notifications
            .send_notification(request)
            .await
            .map_err(|e| AppError::DeliveryFailed(e.to_string()))?;
        Ok(())
    }

    async fn notify_destruction(&self, recipient_id: Uuid, message_id: Uuid) -> AppResult<()> {
        let request = notification_service::models::SendNotificationRequest {
            user_id: recipient_id,
            title: "Message destroyed".to_string(),
            body: "A self-destructing message has been removed".to_string(),
            data: serde_json::json!({ "message_id": message_id }),
        };
        self.notifications
            .send_notification(request)
            .await
            .map_err(|e| AppError::DeliveryFailed(e.to_string()))?;
        Ok(())
    }
}
