use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::NotifyError;
use crate::models::{
    BulkSendReport, PushNotification, ScheduledNotification, SendNotificationRequest,
};
use crate::services::NotificationService;

use super::ApiResponse;

pub async fn send_notification(
    State(service): State<Arc<NotificationService>>,
    Json(request): Json<SendNotificationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PushNotification>>), NotifyError> {
    let notification = service.send_notification(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(notification))))
}

#[derive(Debug, Deserialize)]
pub struct BulkSendPayload {
    pub notifications: Vec<SendNotificationRequest>,
}

pub async fn send_bulk(
    State(service): State<Arc<NotificationService>>,
    Json(payload): Json<BulkSendPayload>,
) -> Result<Json<ApiResponse<BulkSendReport>>, NotifyError> {
    Ok(Json(ApiResponse::ok(
        service.send_bulk(payload.notifications).await?,
    )))
}

#[derive(Debug, Deserialize)]
pub struct SchedulePayload {
    #[serde(flatten)]
    pub request: SendNotificationRequest,
    pub deliver_at: DateTime<Utc>,
}

pub async fn schedule_notification(
    State(service): State<Arc<NotificationService>>,
    Json(payload): Json<SchedulePayload>,
) -> Result<(StatusCode, Json<ApiResponse<ScheduledNotification>>), NotifyError> {
    let scheduled = service
        .schedule_notification(payload.request, payload.deliver_at)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(scheduled))))
}

pub async fn list_notifications(
    State(service): State<Arc<NotificationService>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<PushNotification>>>, NotifyError> {
    Ok(Json(ApiResponse::ok(
        service.list_notifications(user_id).await?,
    )))
}

#[derive(Debug, Deserialize)]
pub struct MarkReadPayload {
    pub user_id: Uuid,
}

pub async fn mark_read(
    State(service): State<Arc<NotificationService>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MarkReadPayload>,
) -> Result<Json<ApiResponse<serde_json::Value>>, NotifyError> {
    let updated = service.mark_read(id, payload.user_id).await?;
    Ok(Json(ApiResponse::ok(json!({ "updated": updated }))))
}
