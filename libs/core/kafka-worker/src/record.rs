//! Broker seams.
//!
//! The producer and worker talk to a broker only through these traits, so
//! the Kafka client and the in-memory broker are interchangeable.

use crate::config::WorkerConfig;
use crate::error::StreamError;
use async_trait::async_trait;
use std::time::Duration;

/// A message read from a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub topic: String,
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub partition: i32,
    pub offset: i64,
}

/// Broker acknowledgment of a published message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub partition: i32,
    pub offset: i64,
}

/// Publishing side of a broker.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Publish one message and wait up to `ack_timeout` for the acknowledgment.
    async fn send(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
        ack_timeout: Duration,
    ) -> Result<Delivery, StreamError>;

    /// Block until buffered messages are delivered or `timeout` lapses.
    async fn flush(&self, timeout: Duration) -> Result<(), StreamError>;
}

/// Consuming side of a broker, bound to one topic and group.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Wait up to `timeout` for messages and return at most `max` of them.
    /// An empty batch means the wait lapsed.
    async fn poll_batch(&self, max: usize, timeout: Duration) -> Result<Vec<Record>, StreamError>;

    /// Mark `record` as handled for the group.
    async fn commit(&self, record: &Record) -> Result<(), StreamError>;
}

/// Opens consuming sessions.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Source: RecordSource + 'static;

    /// Subscribe to `config.topic` as `config.consumer_group`, failing when
    /// the broker cannot be reached.
    async fn connect(&self, config: &WorkerConfig) -> Result<Self::Source, StreamError>;
}
