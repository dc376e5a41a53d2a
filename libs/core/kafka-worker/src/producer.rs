//! Topic producer for publishing messages
//!
//! Generic producer that any service can use to queue messages for
//! background processing.
//!
//! # Example
//!
//! ```rust,ignore
//! use kafka_worker::{KafkaSink, ProducerConfig, TopicProducer};
//!
//! let config = ProducerConfig::from_topic_def::<EmailTopic>();
//! let producer = TopicProducer::new(KafkaSink::new(&config)?, config);
//! let delivery = producer.send(&envelope).await?;
//! ```

use crate::config::ProducerConfig;
use crate::error::StreamError;
use crate::metrics;
use crate::record::{Delivery, RecordSink};
use crate::registry::TopicMessage;
use std::sync::Arc;
use tracing::{debug, info};

/// Generic topic producer.
pub struct TopicProducer<S: RecordSink> {
    sink: Arc<S>,
    config: ProducerConfig,
}

impl<S: RecordSink> TopicProducer<S> {
    pub fn new(sink: S, config: ProducerConfig) -> Self {
        Self {
            sink: Arc::new(sink),
            config,
        }
    }

    /// Create from an Arc<S> (for sharing a client).
    pub fn from_arc(sink: Arc<S>, config: ProducerConfig) -> Self {
        Self { sink, config }
    }

    /// Get the topic name.
    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    pub fn config(&self) -> &ProducerConfig {
        &self.config
    }

    /// Publish a message keyed by its partition key and wait for the
    /// broker acknowledgment.
    pub async fn send<M: TopicMessage>(&self, message: &M) -> Result<Delivery, StreamError> {
        let payload = serde_json::to_vec(message)?;
        let key = message.partition_key();

        let result = self
            .sink
            .send(&self.config.topic, &key, &payload, self.config.ack_timeout)
            .await;
        metrics::message_published(&self.config.topic, message.label(), result.is_ok());
        let delivery = result?;

        info!(
            message_id = %message.message_id(),
            topic = %self.config.topic,
            partition = delivery.partition,
            offset = delivery.offset,
            "Message delivered"
        );

        Ok(delivery)
    }

    /// Flush buffered messages.
    pub async fn flush(&self) -> Result<(), StreamError> {
        self.sink.flush(self.config.flush_timeout).await?;
        debug!(topic = %self.config.topic, "Producer flushed");
        Ok(())
    }
}

impl<S: RecordSink> Clone for TopicProducer<S> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBroker;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Ping {
        id: String,
        user: String,
    }

    impl TopicMessage for Ping {
        fn message_id(&self) -> &str {
            &self.id
        }

        fn partition_key(&self) -> String {
            format!("user_{}", self.user)
        }
    }

    #[tokio::test]
    async fn test_send_uses_partition_key() {
        let broker = InMemoryBroker::new();
        let producer = TopicProducer::new(broker.clone(), ProducerConfig::new("pings"));

        let ping = Ping {
            id: "p1".into(),
            user: "7".into(),
        };
        let delivery = producer.send(&ping).await.unwrap();
        assert_eq!(delivery.offset, 0);

        let published = broker.published("pings").await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].key.as_deref(), Some("user_7"));
        let decoded: Ping = serde_json::from_slice(&published[0].payload).unwrap();
        assert_eq!(decoded, ping);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_times_out_without_ack() {
        let broker = InMemoryBroker::new();
        broker.set_ack_delay(Some(Duration::from_secs(60))).await;
        let producer = TopicProducer::new(broker.clone(), ProducerConfig::new("pings"));

        let ping = Ping {
            id: "p1".into(),
            user: "7".into(),
        };
        let err = producer.send(&ping).await.unwrap_err();
        assert!(matches!(err, StreamError::Timeout(d) if d == Duration::from_secs(10)));
        assert!(broker.published("pings").await.is_empty());
    }
}
