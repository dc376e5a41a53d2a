//! Kafka worker error types and error classification
//!
//! Errors are grouped into a small set of kinds so callers can log and
//! count them consistently:
//! - **Connection**: broker unreachable or the client could not be created
//! - **Timeout**: an acknowledgment or poll did not complete in time
//! - **Serialization**: a payload could not be encoded or decoded
//! - **Validation**: a message is structurally invalid for its processor
//! - **Transport**: the downstream side effect (e.g. mail delivery) failed

use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Kind of error, used for log fields and metric labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connection,
    Timeout,
    Serialization,
    Validation,
    Transport,
    Config,
    Processing,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Validation => "validation",
            ErrorKind::Transport => "transport",
            ErrorKind::Config => "config",
            ErrorKind::Processing => "processing",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Topic producer / worker errors
#[derive(Error, Debug)]
pub enum StreamError {
    /// Kafka client error
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    /// Broker could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Message failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Downstream delivery failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// No acknowledgment within the allowed time
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other processing failure
    #[error("Processing error: {0}")]
    Processing(String),
}

impl StreamError {
    pub fn connection(message: impl Into<String>) -> Self {
        StreamError::Connection(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        StreamError::Validation(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        StreamError::Transport(message.into())
    }

    pub fn processing(message: impl Into<String>) -> Self {
        StreamError::Processing(message.into())
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            StreamError::Kafka(e) => match e.rdkafka_error_code() {
                Some(RDKafkaErrorCode::MessageTimedOut) | Some(RDKafkaErrorCode::OperationTimedOut) => {
                    ErrorKind::Timeout
                }
                _ => ErrorKind::Connection,
            },
            StreamError::Connection(_) => ErrorKind::Connection,
            StreamError::Serialization(_) => ErrorKind::Serialization,
            StreamError::Validation(_) => ErrorKind::Validation,
            StreamError::Transport(_) => ErrorKind::Transport,
            StreamError::Timeout(_) => ErrorKind::Timeout,
            StreamError::Config(_) => ErrorKind::Config,
            StreamError::Processing(_) => ErrorKind::Processing,
        }
    }

    /// Check if this is a broker connection error
    pub fn is_connection_error(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Serialization(err.to_string())
    }
}

impl From<core_config::ConfigError> for StreamError {
    fn from(err: core_config::ConfigError) -> Self {
        StreamError::Config(err.to_string())
    }
}
