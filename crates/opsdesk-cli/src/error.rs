//! Error types for the OpsDesk CLI

use color_eyre::eyre::Report;
use thiserror::Error;

/// CLI error type with minimal variants
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file issues
    #[error("Configuration error: {0}")]
    Config(#[from] opsdesk_common::ConfigurationError),

    /// API communication errors
    #[error("API error: {0}")]
    Api(#[from] opsdesk_sdk::ApiError),

    /// Session file issues
    #[error("Session storage error: {0}")]
    Storage(#[from] opsdesk_sdk::session::StoreError),

    /// Bad command-line input
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Output encoding
    #[error("Failed to encode output: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Everything else (using color-eyre's Report for rich errors)
    #[error(transparent)]
    Internal(#[from] Report),
}

impl CliError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
