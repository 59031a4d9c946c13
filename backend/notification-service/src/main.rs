use std::sync::Arc;

use tracing::info;

use notification_service::config::Config;
use notification_service::error::NotifyError;
use notification_service::handlers::build_router;
use notification_service::logging;
use notification_service::services::{LoggingGateway, NotificationService};
use notification_service::store::MemoryStore;

#[tokio::main]
async fn main() -> Result<(), NotifyError> {
    logging::init_tracing();

    let config = Config::from_env();
    let service = Arc::new(NotificationService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(LoggingGateway::default()),
    ));
    service.clone().spawn_scheduler(config.scheduler_sweep_secs);

    let app = build_router(service);
    let addr = format!("0.0.0.0:{}", config.port);
    info!(%addr, "notification-service listening");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| NotifyError::StartServer(e.to_string()))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| NotifyError::StartServer(e.to_string()))?;
    Ok(())
}
