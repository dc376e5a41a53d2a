//! Kafka-backed sink and source built on rdkafka.

use crate::config::{ProducerConfig, WorkerConfig};
use crate::error::StreamError;
use crate::record::{Connector, Delivery, Record, RecordSink, RecordSource};
use async_trait::async_trait;
use futures::FutureExt;
use rdkafka::Message;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::BorrowedMessage;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Publishes records with a `FutureProducer`.
#[derive(Clone)]
pub struct KafkaSink {
    producer: FutureProducer,
}

impl KafkaSink {
    /// Create the producer client. Creation does not contact the broker.
    pub fn new(config: &ProducerConfig) -> Result<Self, StreamError> {
        let producer: FutureProducer = config.client_config().create()?;
        info!(
            bootstrap_servers = %config.bootstrap_servers,
            topic = %config.topic,
            "Kafka producer created"
        );
        Ok(Self { producer })
    }

    pub fn from_producer(producer: FutureProducer) -> Self {
        Self { producer }
    }
}

#[async_trait]
impl RecordSink for KafkaSink {
    async fn send(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
        ack_timeout: Duration,
    ) -> Result<Delivery, StreamError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        let (partition, offset) =
            tokio::time::timeout(ack_timeout, self.producer.send(record, ack_timeout))
                .await
                .map_err(|_| StreamError::Timeout(ack_timeout))?
                .map_err(|(e, _)| StreamError::from(e))?;

        Ok(Delivery { partition, offset })
    }

    async fn flush(&self, timeout: Duration) -> Result<(), StreamError> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|e| StreamError::processing(format!("flush task failed: {e}")))??;
        Ok(())
    }
}

/// Opens `KafkaSource` sessions.
#[derive(Debug, Clone)]
pub struct KafkaConnector {
    metadata_timeout: Duration,
}

impl KafkaConnector {
    pub fn new() -> Self {
        Self {
            metadata_timeout: Duration::from_secs(10),
        }
    }

    /// Bound on the reachability probe made while connecting
    pub fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }
}

impl Default for KafkaConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for KafkaConnector {
    type Source = KafkaSource;

    async fn connect(&self, config: &WorkerConfig) -> Result<KafkaSource, StreamError> {
        let consumer: StreamConsumer = config.client_config().create()?;
        let consumer = Arc::new(consumer);

        // Client creation is lazy; a metadata round trip proves the broker answers.
        let probe = Arc::clone(&consumer);
        let topic = config.topic.clone();
        let timeout = self.metadata_timeout;
        tokio::task::spawn_blocking(move || {
            probe.fetch_metadata(Some(topic.as_str()), timeout).map(|_| ())
        })
        .await
        .map_err(|e| StreamError::connection(format!("metadata task failed: {e}")))?
        .map_err(|e| StreamError::connection(format!("broker unreachable: {e}")))?;

        consumer.subscribe(&[config.topic.as_str()])?;

        info!(
            bootstrap_servers = %config.bootstrap_servers,
            topic = %config.topic,
            group = %config.consumer_group,
            "Kafka consumer subscribed"
        );

        Ok(KafkaSource {
            consumer,
            enable_auto_commit: config.enable_auto_commit,
        })
    }
}

/// A subscribed `StreamConsumer`.
pub struct KafkaSource {
    consumer: Arc<StreamConsumer>,
    enable_auto_commit: bool,
}

#[async_trait]
impl RecordSource for KafkaSource {
    async fn poll_batch(&self, max: usize, timeout: Duration) -> Result<Vec<Record>, StreamError> {
        let first = match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Err(_) => return Ok(Vec::new()),
            Ok(message) => to_record(&message?),
        };

        let mut batch = vec![first];
        while batch.len() < max {
            match self.consumer.recv().now_or_never() {
                Some(Ok(message)) => batch.push(to_record(&message)),
                Some(Err(e)) => {
                    warn!(error = %e, "Error draining batch, handling what was received");
                    break;
                }
                None => break,
            }
        }

        debug!(count = batch.len(), "Polled batch");
        Ok(batch)
    }

    async fn commit(&self, record: &Record) -> Result<(), StreamError> {
        self.consumer
            .store_offset(&record.topic, record.partition, record.offset)?;
        if !self.enable_auto_commit {
            self.consumer.commit_consumer_state(CommitMode::Async)?;
        }
        Ok(())
    }
}

fn to_record(message: &BorrowedMessage<'_>) -> Record {
    Record {
        topic: message.topic().to_string(),
        key: message
            .key()
            .map(|key| String::from_utf8_lossy(key).into_owned()),
        payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        partition: message.partition(),
        offset: message.offset(),
    }
}
