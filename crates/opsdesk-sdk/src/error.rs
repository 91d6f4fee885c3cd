//! Error types for the OpsDesk SDK

use crate::session::StoreError;
use thiserror::Error;

/// Main error type for SDK operations
#[derive(Debug, Error)]
pub enum ApiError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] opsdesk_common::ConfigurationError),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Session storage error
    #[error("Session storage error: {0}")]
    Storage(#[from] StoreError),

    /// Authentication error (missing, expired or invalid token)
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    /// Authorization error
    #[error("Authorization error: {message}")]
    Authorization { message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Invalid request built by the caller
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Not found
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// Bad request with message
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Request timed out before a response arrived
    #[error("Request timeout")]
    Timeout,

    /// No response received (unreachable host, refused connection, ...)
    #[error("Network error: {message}")]
    Network { message: String },

    /// Service unavailable
    #[error("Service temporarily unavailable")]
    ServiceUnavailable,

    /// Failure reported inside a successful HTTP response body
    #[error("Application error: {message}")]
    Application { message: String, code: Option<i64> },

    /// Internal or unclassified error
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Get error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Config(_) => "OPSDESK_CONFIG_ERROR",
            ApiError::HttpClient(_) => "OPSDESK_HTTP_CLIENT_ERROR",
            ApiError::Storage(_) => "OPSDESK_STORAGE_ERROR",
            ApiError::Authentication { .. } => "OPSDESK_AUTH_ERROR",
            ApiError::Authorization { .. } => "OPSDESK_AUTHZ_ERROR",
            ApiError::RateLimitExceeded => "OPSDESK_RATE_LIMIT",
            ApiError::InvalidRequest { .. } => "OPSDESK_INVALID_REQUEST",
            ApiError::NotFound { .. } => "OPSDESK_NOT_FOUND",
            ApiError::BadRequest { .. } => "OPSDESK_BAD_REQUEST",
            ApiError::Timeout => "OPSDESK_TIMEOUT",
            ApiError::Network { .. } => "OPSDESK_NETWORK_ERROR",
            ApiError::ServiceUnavailable => "OPSDESK_SERVICE_UNAVAILABLE",
            ApiError::Application { .. } => "OPSDESK_APPLICATION_ERROR",
            ApiError::Internal { .. } => "OPSDESK_INTERNAL_ERROR",
            ApiError::Serialization(_) => "OPSDESK_SERIALIZATION_ERROR",
        }
    }

    /// Transient failures the user may simply retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Timeout | ApiError::Network { .. } | ApiError::ServiceUnavailable
        )
    }

    /// Check if error is a client error
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ApiError::Authentication { .. }
                | ApiError::Authorization { .. }
                | ApiError::RateLimitExceeded
                | ApiError::InvalidRequest { .. }
                | ApiError::NotFound { .. }
                | ApiError::BadRequest { .. }
        )
    }
}
