use std::sync::Arc;

use tracing::info;

use messaging_service::config::Config;
use messaging_service::error::AppError;
use messaging_service::logging;
use messaging_service::routes::build_router;
use messaging_service::services::{PushNotifier, UnconfiguredTranscriber};
use messaging_service::state::AppState;
use messaging_service::store::MemoryStore;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    logging::init_tracing();

    let config = Config::from_env()?;
    let port = config.port;
    let sweep_secs = config.destruct_sweep_secs;

    let notifications = Arc::new(notification_service::services::NotificationService::new(
        Arc::new(notification_service::store::MemoryStore::new()),
        Arc::new(notification_service::services::LoggingGateway::default()),
    ));
    let notifier = Arc::new(PushNotifier::new(notifications));

    let state = AppState::build(
        config,
        MemoryStore::new(),
        notifier,
        Arc::new(UnconfiguredTranscriber::default()),
    );
    state.destruct.clone().spawn_reaper(sweep_secs);

    let app = build_router(state);
    let addr = format!("0.0.0.0:{port}");
    info!(%addr, "messaging-service listening");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::StartServer(e.to_string()))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::StartServer(e.to_string()))?;
    Ok(())
}
