use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use error_types::{ErrorResponse, ServiceError};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("key invalid: {0}")]
    KeyInvalid(String),

    #[error("message destroyed")]
    MessageDestroyed,

    #[error("access denied: {reason} (risk score {risk_score})")]
    AccessDenied { reason: String, risk_score: u8 },

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("internal server error")]
    Internal,
}

impl AppError {
    /// Cross-service classification; wire codes and HTTP statuses both
    /// derive from it.
    pub fn taxonomy(&self) -> ServiceError {
        match self {
            AppError::NotFound(what) => ServiceError::NotFound((*what).to_string()),
            AppError::Forbidden(m) => ServiceError::Forbidden(m.clone()),
            AppError::InvalidInput(m) => ServiceError::InvalidInput(m.clone()),
            AppError::AlreadyExists(m) => ServiceError::AlreadyExists(m.clone()),
            AppError::Conflict(m) => ServiceError::Conflict(m.clone()),
            AppError::KeyInvalid(m) => ServiceError::KeyInvalid(m.clone()),
            AppError::MessageDestroyed => ServiceError::MessageDestroyed,
            AppError::AccessDenied { reason, .. } => ServiceError::AccessDenied(reason.clone()),
            AppError::DeliveryFailed(m) => ServiceError::DeliveryFailed(m.clone()),
            AppError::Config(_)
            | AppError::StartServer(_)
            | AppError::Encryption(_)
            | AppError::Internal => ServiceError::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.taxonomy().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn code(&self) -> &'static str {
        self.taxonomy().code()
    }
}

impl From<crypto_core::CryptoError> for AppError {
    fn from(e: crypto_core::CryptoError) -> Self {
        AppError::Encryption(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut body = ErrorResponse::new(self.code(), self.to_string());
        if let AppError::AccessDenied { risk_score, .. } = &self {
            body = body.with_details(serde_json::json!({ "risk_score": risk_score }));
        }
        (status, Json(body)).into_response()
    }
}
