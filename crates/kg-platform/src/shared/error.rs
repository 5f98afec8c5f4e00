//! Platform Error Types

use thiserror::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response, Json},
};
use utoipa::ToSchema;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Authorization error: {message}")]
    Unauthorized { message: String },

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bson::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] bson::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PlatformError {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied { message: message.into() }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict { message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// True for the server-side class of failures whose details stay in the
    /// log rather than the response body.
    fn is_internal(&self) -> bool {
        matches!(
            self,
            PlatformError::Database(_)
                | PlatformError::Serialization(_)
                | PlatformError::Deserialization(_)
                | PlatformError::Json(_)
                | PlatformError::Internal { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Error response body
#[derive(Debug, serde::Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            PlatformError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            PlatformError::Validation { .. } => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            PlatformError::PermissionDenied { .. } => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
            PlatformError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
            PlatformError::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        // Store errors keep their detail in the log; clients get a stable,
        // driver-agnostic message.
        let message = if self.is_internal() {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_constructors() {
        match PlatformError::not_found("Domain", "acme") {
            PlatformError::NotFound { entity_type, id } => {
                assert_eq!(entity_type, "Domain");
                assert_eq!(id, "acme");
            }
            other => panic!("unexpected variant: {other:?}"),
        }

        assert!(matches!(
            PlatformError::bad_request("x"),
            PlatformError::Validation { .. }
        ));
        assert!(matches!(
            PlatformError::conflict("x"),
            PlatformError::Conflict { .. }
        ));
    }

    #[test]
    fn test_internal_class_is_masked() {
        assert!(PlatformError::internal("boom").is_internal());
        assert!(!PlatformError::validation("bad").is_internal());
        assert!(!PlatformError::not_found("Token", "t").is_internal());
    }
}
