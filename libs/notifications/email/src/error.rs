//! Error types for the email pipeline.

use kafka_worker::StreamError;
use thiserror::Error;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur while building, queueing or delivering an email.
#[derive(Error, Debug)]
pub enum NotificationError {
    /// A required envelope field is missing
    #[error("Validation error: {0}")]
    Validation(String),

    /// Template missing or failed to render
    #[error("Template error: {0}")]
    Template(String),

    /// Mail transport failed to deliver
    #[error("Transport error: {0}")]
    Transport(String),

    /// Broker publish failed
    #[error("Queue error: {0}")]
    Queue(#[from] StreamError),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for NotificationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<core_config::ConfigError> for NotificationError {
    fn from(err: core_config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<NotificationError> for StreamError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::Validation(msg) => StreamError::Validation(msg),
            NotificationError::Template(msg) => StreamError::Processing(msg),
            NotificationError::Transport(msg) => StreamError::Transport(msg),
            NotificationError::Queue(e) => e,
            NotificationError::Serialization(msg) => StreamError::Serialization(msg),
            NotificationError::Config(msg) => StreamError::Config(msg),
        }
    }
}
