pub mod gateway;
pub mod notification_service;

pub use gateway::{LoggingGateway, PushGateway, PushOutcome};
pub use notification_service::NotificationService;
