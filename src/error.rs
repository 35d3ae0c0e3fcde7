// src/error.rs

//! Unified error handling for the posting pipeline.

use std::fmt;
use std::path::Path;

use thiserror::Error;

/// Result type alias for pipeline operations.
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

    /// Configuration error (missing credential, bad config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Rendering a single record failed
    #[error("Render error for {record}: {message}")]
    Render { record: String, message: String },

    /// Uploading a single file failed
    #[error("Upload error for {file}: {message}")]
    Upload { file: String, message: String },

    /// The social platform rejected a request
    #[error("Platform error during {stage}: {message}")]
    Platform { stage: String, message: String },

    /// The social platform could not be reached
    #[error("Platform unreachable during {stage}: {message}")]
    PlatformUnreachable { stage: String, message: String },

    /// A media container reached a terminal failure state
    #[error("Container {container_id} failed with status {status}")]
    ContainerFailed {
        container_id: String,
        status: String,
    },

    /// A media container did not become ready in time
    #[error("Container {container_id} not ready after {attempts} checks (time exceeded)")]
    ContainerTimeout { container_id: String, attempts: u32 },

    /// Not enough finished containers to assemble a carousel
    #[error("Insufficient images for carousel: {ready} ready, at least {required} required")]
    InsufficientImages { ready: usize, required: usize },

    /// A pipeline stage produced nothing usable
    #[error("Pipeline aborted: {0}")]
    Pipeline(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a render error for a record.
    pub fn render(record: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Render {
            record: record.into(),
            message: message.to_string(),
        }
    }

    /// Create an upload error for a file.
    pub fn upload(file: &Path, message: impl fmt::Display) -> Self {
        Self::Upload {
            file: file.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Create a platform error with the protocol stage it happened in.
    pub fn platform(stage: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Platform {
            stage: stage.into(),
            message: message.to_string(),
        }
    }

    /// Create a transport error for a platform call that never got an answer.
    pub fn platform_unreachable(stage: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::PlatformUnreachable {
            stage: stage.into(),
            message: message.to_string(),
        }
    }

    /// Create a pipeline abort error.
    pub fn pipeline(message: impl Into<String>) -> Self {
        Self::Pipeline(message.into())
    }
}
