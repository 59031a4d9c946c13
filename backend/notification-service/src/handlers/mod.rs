use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::services::NotificationService;

pub mod devices;
pub mod notifications;

/// Uniform success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "notification-service" }))
}

pub fn build_router(service: Arc<NotificationService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/devices/register", post(devices::register_device))
        .route("/devices/unregister", post(devices::unregister_device))
        .route("/devices/user/:user_id", get(devices::get_user_devices))
        .route("/devices/settings", put(devices::update_device_settings))
        .route("/notifications/send", post(notifications::send_notification))
        .route("/notifications/bulk", post(notifications::send_bulk))
        .route(
            "/notifications/schedule",
            post(notifications::schedule_notification),
        )
        .route(
            "/notifications/user/:user_id",
            get(notifications::list_notifications),
        )
        .route("/notifications/:id/read", post(notifications::mark_read))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
