//! Topic registry types and definitions.
//!
//! This module provides:
//! - `TopicDef` trait for domain-specific topic definitions
//! - `TopicMessage` trait for payloads carried on a topic

use serde::{Serialize, de::DeserializeOwned};

/// Topic definition trait.
///
/// Each domain implements this trait to name its topic and consumer group,
/// so that producers and workers agree on them.
///
/// # Example
///
/// ```rust,ignore
/// use kafka_worker::TopicDef;
///
/// pub struct EmailTopic;
///
/// impl TopicDef for EmailTopic {
///     const TOPIC: &'static str = "email_notifications";
///     const CONSUMER_GROUP: &'static str = "email_consumer_group";
/// }
/// ```
pub trait TopicDef: Send + Sync {
    /// The Kafka topic name.
    const TOPIC: &'static str;

    /// The consumer group name for this topic.
    const CONSUMER_GROUP: &'static str;

    /// Maximum messages handled per poll.
    const BATCH_SIZE: usize = 10;

    /// Get the topic name.
    fn topic() -> &'static str {
        Self::TOPIC
    }

    /// Get the consumer group name.
    fn consumer_group() -> &'static str {
        Self::CONSUMER_GROUP
    }
}

/// Trait for topic message payloads.
///
/// Messages are serialized as JSON. The partition key decides ordering:
/// messages sharing a key land on the same partition.
pub trait TopicMessage: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Identifier used for logging and tracking.
    fn message_id(&self) -> &str;

    /// Key used for partitioning.
    fn partition_key(&self) -> String;

    /// Short label for metrics (e.g. the message type).
    fn label(&self) -> &'static str {
        "message"
    }
}
