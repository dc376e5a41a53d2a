//! Worker and producer configuration
//!
//! `WorkerConfig` configures the topic consumer loop and `ProducerConfig`
//! the publishing side. Both render to librdkafka client properties.

use crate::registry::TopicDef;
use core_config::kafka::KafkaConfig;
use rdkafka::ClientConfig;
use std::time::Duration;
use uuid::Uuid;

/// What the worker does with a message whose processing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure and commit the offset. The message is not retried
    /// and no dead-letter copy is kept.
    #[default]
    LogAndCommit,
}

/// Configuration for the topic worker
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Kafka bootstrap servers (comma separated)
    pub bootstrap_servers: String,

    /// Topic to consume
    pub topic: String,

    /// Consumer group name
    pub consumer_group: String,

    /// Unique consumer ID (auto-generated if not provided)
    pub consumer_id: String,

    /// Where to start when the group has no committed offset
    pub auto_offset_reset: String,

    /// Let the client commit stored offsets in the background
    pub enable_auto_commit: bool,

    /// How long a poll waits for the first message
    pub poll_timeout: Duration,

    /// Pause after a failed poll
    pub error_backoff: Duration,

    /// Bound on how long `stop` waits for the loop to finish
    pub shutdown_timeout: Duration,

    /// Maximum messages handled per poll
    pub batch_size: usize,

    /// Session timeout for group membership
    pub session_timeout: Duration,

    /// Heartbeat interval for group membership
    pub heartbeat_interval: Duration,

    /// Maximum time between polls before the member is evicted
    pub max_poll_interval: Duration,

    /// Handling of failed messages
    pub failure_policy: FailurePolicy,
}

impl WorkerConfig {
    /// Create a new WorkerConfig with explicit topic and group
    pub fn new(topic: impl Into<String>, consumer_group: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: "localhost:9092".to_string(),
            topic: topic.into(),
            consumer_group: consumer_group.into(),
            consumer_id: format!("worker-{}", Uuid::new_v4()),
            auto_offset_reset: "earliest".to_string(),
            enable_auto_commit: true,
            poll_timeout: Duration::from_secs(5),
            error_backoff: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(10),
            batch_size: 10,
            session_timeout: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(10),
            max_poll_interval: Duration::from_secs(300),
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Create a new WorkerConfig from a TopicDef
    pub fn from_topic_def<T: TopicDef>() -> Self {
        Self::new(T::TOPIC, T::CONSUMER_GROUP).with_batch_size(T::BATCH_SIZE)
    }

    /// Create from loaded Kafka settings
    pub fn from_kafka_config(kafka: &KafkaConfig) -> Self {
        Self::new(kafka.email_topic.clone(), kafka.consumer_group.clone())
            .with_bootstrap_servers(kafka.bootstrap_servers.clone())
            .with_auto_offset_reset(kafka.auto_offset_reset.clone())
            .with_auto_commit(kafka.enable_auto_commit)
    }

    pub fn with_bootstrap_servers(mut self, servers: impl Into<String>) -> Self {
        self.bootstrap_servers = servers.into();
        self
    }

    /// Set the consumer ID
    pub fn with_consumer_id(mut self, id: impl Into<String>) -> Self {
        self.consumer_id = id.into();
        self
    }

    pub fn with_auto_offset_reset(mut self, reset: impl Into<String>) -> Self {
        self.auto_offset_reset = reset.into();
        self
    }

    pub fn with_auto_commit(mut self, enable: bool) -> Self {
        self.enable_auto_commit = enable;
        self
    }

    /// Set the poll timeout
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the backoff after poll errors
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Set the shutdown wait bound
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the batch size
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// librdkafka consumer properties
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.bootstrap_servers)
            .set("group.id", &self.consumer_group)
            .set("client.id", &self.consumer_id)
            .set("auto.offset.reset", &self.auto_offset_reset)
            .set("enable.auto.commit", self.enable_auto_commit.to_string())
            // Offsets are stored only after a message has been handled
            .set("enable.auto.offset.store", "false")
            .set("session.timeout.ms", millis(self.session_timeout))
            .set("heartbeat.interval.ms", millis(self.heartbeat_interval))
            .set("max.poll.interval.ms", millis(self.max_poll_interval));
        config
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::new("email_notifications", "email_consumer_group")
    }
}

/// Configuration for the topic producer
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Kafka bootstrap servers (comma separated)
    pub bootstrap_servers: String,

    /// Topic messages are published to
    pub topic: String,

    /// How long `send` waits for the broker acknowledgment
    pub ack_timeout: Duration,

    /// Required acknowledgments ("all" waits for the full ISR)
    pub acks: String,

    /// Client-side send retries
    pub retries: u32,

    /// Batch size in bytes
    pub batch_size: usize,

    /// Linger before a batch is sent
    pub linger: Duration,

    /// Client buffer size in bytes
    pub buffer_memory: usize,

    /// Maximum request size in bytes
    pub max_request_size: usize,

    /// Bound used by `close` to flush pending messages
    pub flush_timeout: Duration,
}

impl ProducerConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: "localhost:9092".to_string(),
            topic: topic.into(),
            ack_timeout: Duration::from_secs(10),
            acks: "all".to_string(),
            retries: 3,
            batch_size: 16_384,
            linger: Duration::from_millis(10),
            buffer_memory: 33_554_432,
            max_request_size: 1_048_576,
            flush_timeout: Duration::from_secs(10),
        }
    }

    pub fn from_topic_def<T: TopicDef>() -> Self {
        Self::new(T::TOPIC)
    }

    pub fn from_kafka_config(kafka: &KafkaConfig) -> Self {
        Self::new(kafka.email_topic.clone()).with_bootstrap_servers(kafka.bootstrap_servers.clone())
    }

    pub fn with_bootstrap_servers(mut self, servers: impl Into<String>) -> Self {
        self.bootstrap_servers = servers.into();
        self
    }

    /// Set the acknowledgment wait bound
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// librdkafka producer properties
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.bootstrap_servers)
            .set("acks", &self.acks)
            .set("message.send.max.retries", self.retries.to_string())
            .set("batch.size", self.batch_size.to_string())
            .set("linger.ms", millis(self.linger))
            .set("queue.buffering.max.kbytes", (self.buffer_memory / 1024).to_string())
            .set("message.max.bytes", self.max_request_size.to_string())
            .set("message.timeout.ms", millis(self.ack_timeout));
        config
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self::new("email_notifications")
    }
}

fn millis(duration: Duration) -> String {
    duration.as_millis().to_string()
}
