use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::NotifyError;
use crate::models::{DeviceSettings, NotificationDevice, Platform};
use crate::services::NotificationService;

use super::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct RegisterDevicePayload {
    pub user_id: Uuid,
    pub token: String,
    pub platform: Platform,
    pub device_name: Option<String>,
}

pub async fn register_device(
    State(service): State<Arc<NotificationService>>,
    Json(payload): Json<RegisterDevicePayload>,
) -> Result<(StatusCode, Json<ApiResponse<NotificationDevice>>), NotifyError> {
    let device = service
        .register_device(
            payload.user_id,
            payload.token,
            payload.platform,
            payload.device_name,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(device))))
}

#[derive(Debug, Deserialize)]
pub struct UnregisterDevicePayload {
    pub user_id: Uuid,
    pub token: String,
}

pub async fn unregister_device(
    State(service): State<Arc<NotificationService>>,
    Json(payload): Json<UnregisterDevicePayload>,
) -> Result<Json<ApiResponse<serde_json::Value>>, NotifyError> {
    let removed = service
        .unregister_device(payload.user_id, &payload.token)
        .await?;
    Ok(Json(ApiResponse::ok(json!({ "deactivated": removed }))))
}

pub async fn get_user_devices(
    State(service): State<Arc<NotificationService>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<NotificationDevice>>>, NotifyError> {
    Ok(Json(ApiResponse::ok(
        service.get_user_devices(user_id).await?,
    )))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsPayload {
    pub user_id: Uuid,
    pub token: String,
    pub settings: DeviceSettings,
}

pub async fn update_device_settings(
    State(service): State<Arc<NotificationService>>,
    Json(payload): Json<UpdateSettingsPayload>,
) -> Result<Json<ApiResponse<NotificationDevice>>, NotifyError> {
    let device = service
        .update_device_settings(payload.user_id, &payload.token, payload.settings)
        .await?;
    Ok(Json(ApiResponse::ok(device)))
}
