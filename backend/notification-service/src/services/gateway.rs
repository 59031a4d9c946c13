use async_trait::async_trait;
use tracing::info;

use crate::error::NotifyResult;
use crate::models::{NotificationDevice, SendNotificationRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Delivered,
    Rejected,
}

/// Vendor push seam (APNs, FCM and friends live behind this).
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn push(
        &self,
        device: &NotificationDevice,
        request: &SendNotificationRequest,
    ) -> NotifyResult<PushOutcome>;
}

/// Logs instead of pushing. The default backend when no vendor credentials
/// are configured.
#[derive(Default)]
pub struct LoggingGateway;

#[async_trait]
impl PushGateway for LoggingGateway {
    async fn push(
        &self,
        device: &NotificationDevice,
        request: &SendNotificationRequest,
    ) -> NotifyResult<PushOutcome> {
        info!(
            user_id = %request.user_id,
            platform = device.platform.as_str(),
            title = %request.title,
            "push delivered to log sink"
        );
        Ok(PushOutcome::Delivered)
    }
}
