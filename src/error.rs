// src/error.rs

//! Unified error handling for the cosmic birthday lookup.

use std::fmt;

use thiserror::Error;

/// Result type alias for lookup operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error (missing credential, bad setting)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream provider rejected the request; the message is shown as-is
    #[error("{0}")]
    Provider(String),

    /// User supplied something that is not a calendar date
    #[error("Invalid date '{input}': {message}")]
    InvalidDate { input: String, message: String },

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a provider error carrying the provider's own message.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }

    /// Create an invalid date error.
    pub fn invalid_date(input: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::InvalidDate {
            input: input.into(),
            message: message.to_string(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
