//! Shared error taxonomy and wire envelope for the messaging services.
//!
//! Services keep their own `AppError` enums but converge on this taxonomy
//! when classifying failures and on [`ErrorResponse`] when serializing them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable machine-readable error codes used in API responses.
pub mod error_codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const INVALID_INPUT: &str = "INVALID_INPUT";
    pub const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
    pub const CONFLICT: &str = "CONFLICT";
    pub const KEY_INVALID: &str = "KEY_INVALID";
    pub const MESSAGE_DESTROYED: &str = "MESSAGE_DESTROYED";
    pub const ACCESS_DENIED: &str = "ACCESS_DENIED";
    pub const DELIVERY_FAILED: &str = "DELIVERY_FAILED";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Cross-service error classification.
///
/// Validation and authorization failures are returned synchronously with a
/// specific kind; infrastructure failures inside batch operations are
/// collected and reported alongside successes instead of aborting the batch.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),

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

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("internal error")]
    Internal,
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => error_codes::NOT_FOUND,
            ServiceError::Forbidden(_) => error_codes::FORBIDDEN,
            ServiceError::InvalidInput(_) => error_codes::INVALID_INPUT,
            ServiceError::AlreadyExists(_) => error_codes::ALREADY_EXISTS,
            ServiceError::Conflict(_) => error_codes::CONFLICT,
            ServiceError::KeyInvalid(_) => error_codes::KEY_INVALID,
            ServiceError::MessageDestroyed => error_codes::MESSAGE_DESTROYED,
            ServiceError::AccessDenied(_) => error_codes::ACCESS_DENIED,
            ServiceError::DeliveryFailed(_) => error_codes::DELIVERY_FAILED,
            ServiceError::Internal => error_codes::INTERNAL,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::NotFound(_) => 404,
            ServiceError::Forbidden(_) | ServiceError::AccessDenied(_) => 403,
            ServiceError::InvalidInput(_) => 400,
            ServiceError::AlreadyExists(_) => 409,
            ServiceError::Conflict(_) => 409,
            ServiceError::KeyInvalid(_) => 422,
            ServiceError::MessageDestroyed => 410,
            ServiceError::DeliveryFailed(_) => 502,
            ServiceError::Internal => 500,
        }
    }
}

/// JSON envelope returned on every error path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            timestamp: Utc::now(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<&ServiceError> for ErrorResponse {
    fn from(err: &ServiceError) -> Self {
        ErrorResponse::new(err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ServiceError::MessageDestroyed.code(), "MESSAGE_DESTROYED");
        assert_eq!(
            ServiceError::AccessDenied("geo".into()).status_code(),
            403
        );
    }

    #[test]
    fn envelope_serializes_without_empty_details() {
        let resp = ErrorResponse::from(&ServiceError::NotFound("conversation".into()));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert!(json.get("details").is_none());
    }
}
