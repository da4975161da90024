// src/error.rs

//! Unified error handling for the harvester application.

use std::fmt;

use thiserror::Error;

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Page navigation did not settle within its time bound
    #[error("Navigation timeout loading {url}")]
    NavigationTimeout { url: String },

    /// An awaited element never became visible
    #[error("Timed out waiting for selector '{selector}'")]
    SelectorTimeout { selector: String },

    /// Rendering engine failure (launch, evaluation, protocol)
    #[error("Renderer error: {0}")]
    Renderer(String),

    /// Sink rejected a record
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a navigation timeout error.
    pub fn navigation_timeout(url: impl Into<String>) -> Self {
        Self::NavigationTimeout { url: url.into() }
    }

    /// Create a selector timeout error.
    pub fn selector_timeout(selector: impl Into<String>) -> Self {
        Self::SelectorTimeout {
            selector: selector.into(),
        }
    }

    /// Create a renderer error.
    pub fn renderer(message: impl fmt::Display) -> Self {
        Self::Renderer(message.to_string())
    }

    /// Create a persistence error.
    pub fn persistence(message: impl fmt::Display) -> Self {
        Self::Persistence(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether this error is a navigation or selector timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::NavigationTimeout { .. } | Self::SelectorTimeout { .. }
        )
    }
}
