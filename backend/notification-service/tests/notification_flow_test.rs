use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use notification_service::error::{NotifyError, NotifyResult};
use notification_service::models::{
    DeviceSettings, NotificationDevice, NotificationStatus, Platform, QuietHours,
    SendNotificationRequest,
};
use notification_service::services::{
    LoggingGateway, NotificationService, PushGateway, PushOutcome,
};
use notification_service::store::MemoryStore;

struct FailingGateway;

#[async_trait]
impl PushGateway for FailingGateway {
    async fn push(
        &self,
        _device: &NotificationDevice,
        _request: &SendNotificationRequest,
    ) -> NotifyResult<PushOutcome> {
        Err(NotifyError::Gateway("vendor unavailable".into()))
    }
}

fn service() -> NotificationService {
    NotificationService::new(Arc::new(MemoryStore::new()), Arc::new(LoggingGateway::default()))
}

fn request(user_id: Uuid, title: &str) -> SendNotificationRequest {
    SendNotificationRequest {
        user_id,
        title: title.to_string(),
        body: "body".to_string(),
        data: json!({}),
    }
}

#[tokio::test]
async fn registering_the_same_token_twice_updates_in_place() {
    let service = service();
    let user = Uuid::new_v4();

    let first = service
        .register_device(user, "tok-1".into(), Platform::Ios, Some("phone".into()))
        .await
        .unwrap();
    let second = service
        .register_device(user, "tok-1".into(), Platform::Ios, Some("renamed".into()))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    let devices = service.get_user_devices(user).await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].device_name.as_deref(), Some("renamed"));
}

#[tokio::test]
async fn a_token_switching_accounts_moves_to_the_new_user() {
    let service = service();
    let old_user = Uuid::new_v4();
    let new_user = Uuid::new_v4();

    service
        .register_device(old_user, "tok-shared".into(), Platform::Android, None)
        .await
        .unwrap();
    service
        .register_device(new_user, "tok-shared".into(), Platform::Android, None)
        .await
        .unwrap();

    assert!(service.get_user_devices(old_user).await.unwrap().is_empty());
    assert_eq!(service.get_user_devices(new_user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unregister_is_a_soft_idempotent_deactivation() {
    let service = service();
    let user = Uuid::new_v4();
    service
        .register_device(user, "tok-2".into(), Platform::Web, None)
        .await
        .unwrap();

    assert!(service.unregister_device(user, "tok-2").await.unwrap());
    assert!(!service.unregister_device(user, "tok-2").await.unwrap());
    assert!(service.get_user_devices(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn sending_without_devices_fails() {
    let service = service();
    let err = service
        .send_notification(request(Uuid::new_v4(), "hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::NoActiveDevices));
}

#[tokio::test]
async fn one_send_produces_one_record_across_devices() {
    let service = service();
    let user = Uuid::new_v4();
    service
        .register_device(user, "tok-a".into(), Platform::Ios, None)
        .await
        .unwrap();
    service
        .register_device(user, "tok-b".into(), Platform::Android, None)
        .await
        .unwrap();

    let sent = service
        .send_notification(request(user, "hello"))
        .await
        .unwrap();
    assert_eq!(sent.status, NotificationStatus::Sent);
    assert_eq!(sent.devices_attempted, 2);
    assert_eq!(sent.devices_delivered, 2);

    assert_eq!(service.list_notifications(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn gateway_failure_records_a_failed_send() {
    let service =
        NotificationService::new(Arc::new(MemoryStore::new()), Arc::new(FailingGateway));
    let user = Uuid::new_v4();
    service
        .register_device(user, "tok-f".into(), Platform::Ios, None)
        .await
        .unwrap();

    let sent = service
        .send_notification(request(user, "doomed"))
        .await
        .unwrap();
    assert_eq!(sent.status, NotificationStatus::Failed);
    assert!(sent.failure_reason.is_some());
}

#[tokio::test]
async fn quiet_hours_suppress_delivery() {
    let service = service();
    let user = Uuid::new_v4();
    let device = service
        .register_device(user, "tok-q".into(), Platform::Ios, None)
        .await
        .unwrap();

    // A window wrapped around the current instant always contains it.
    let now = Utc::now().time();
    let settings = DeviceSettings {
        quiet_hours: Some(QuietHours {
            start: now.overflowing_sub_signed(Duration::hours(1)).0,
            end: now.overflowing_add_signed(Duration::hours(1)).0,
        }),
        ..Default::default()
    };
    service
        .update_device_settings(user, &device.token, settings)
        .await
        .unwrap();

    let sent = service
        .send_notification(request(user, "quiet"))
        .await
        .unwrap();
    assert_eq!(sent.status, NotificationStatus::Suppressed);
    assert_eq!(sent.devices_attempted, 0);
}

#[tokio::test]
async fn bulk_send_reports_partial_failures() {
    let service = service();
    let with_device = Uuid::new_v4();
    let without_device = Uuid::new_v4();
    service
        .register_device(with_device, "tok-ok".into(), Platform::Web, None)
        .await
        .unwrap();

    let report = service
        .send_bulk(vec![
            request(with_device, "one"),
            request(without_device, "two"),
        ])
        .await
        .unwrap();

    assert_eq!(report.requested, 2);
    assert_eq!(report.sent, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].user_id, without_device);
}

#[tokio::test]
async fn scheduling_never_delivers_synchronously() {
    let service = service();
    let user = Uuid::new_v4();
    service
        .register_device(user, "tok-s".into(), Platform::Ios, None)
        .await
        .unwrap();

    // Even a past deliver_at waits for the sweep.
    service
        .schedule_notification(request(user, "later"), Utc::now() - Duration::minutes(1))
        .await
        .unwrap();
    assert!(service.list_notifications(user).await.unwrap().is_empty());

    let processed = service.process_scheduled().await.unwrap();
    assert_eq!(processed, 1);
    assert_eq!(service.list_notifications(user).await.unwrap().len(), 1);

    // The sweep is one-shot per scheduled row.
    assert_eq!(service.process_scheduled().await.unwrap(), 0);
}

#[tokio::test]
async fn mark_read_is_idempotent() {
    let service = service();
    let user = Uuid::new_v4();
    service
        .register_device(user, "tok-r".into(), Platform::Ios, None)
        .await
        .unwrap();
    let sent = service
        .send_notification(request(user, "read me"))
        .await
        .unwrap();

    assert!(service.mark_read(sent.id, user).await.unwrap());
    assert!(!service.mark_read(sent.id, user).await.unwrap());

    let err = service.mark_read(sent.id, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, NotifyError::NotFound(_)));
}
