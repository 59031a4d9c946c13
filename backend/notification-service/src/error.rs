use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use error_types::{ErrorResponse, ServiceError};
use thiserror::Error;

pub type NotifyResult<T> = Result<T, NotifyError>;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("user has no active devices")]
    NoActiveDevices,

    #[error("push gateway error: {0}")]
    Gateway(String),

    #[error("internal server error")]
    Internal,
}

impl NotifyError {
    /// Cross-service classification shared with messaging-service.
    pub fn taxonomy(&self) -> ServiceError {
        match self {
            NotifyError::NotFound(what) => ServiceError::NotFound((*what).to_string()),
            NotifyError::InvalidInput(m) => ServiceError::InvalidInput(m.clone()),
            NotifyError::NoActiveDevices => {
                ServiceError::InvalidInput("user has no active devices".into())
            }
            NotifyError::Gateway(m) => ServiceError::DeliveryFailed(m.clone()),
            NotifyError::Config(_) | NotifyError::StartServer(_) | NotifyError::Internal => {
                ServiceError::Internal
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            // A state problem, not a malformed request.
            NotifyError::NoActiveDevices => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::from_u16(self.taxonomy().status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    pub fn code(&self) -> &'static str {
        self.taxonomy().code()
    }
}

impl IntoResponse for NotifyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(self.code(), self.to_string());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_drives_codes_but_no_active_devices_stays_unprocessable() {
        assert_eq!(
            NotifyError::Gateway("apns".into()).taxonomy(),
            ServiceError::DeliveryFailed("apns".into())
        );
        assert_eq!(NotifyError::Gateway("apns".into()).code(), "DELIVERY_FAILED");
        assert_eq!(
            NotifyError::NoActiveDevices.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(NotifyError::NoActiveDevices.code(), "INVALID_INPUT");
    }
}
