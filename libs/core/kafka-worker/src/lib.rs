//! Kafka Worker Framework
//!
//! A generic Kafka producer and consumer worker for background messages.
//!
//! ## Features
//!
//! - **Generic worker**: `TopicWorker<M, P, C>` processes any message type
//! - **Lifecycle**: idempotent `start`/`stop` with observable `ConsumerState`
//! - **Consumer groups**: offsets committed after each message is handled
//! - **Swappable broker**: rdkafka in production, `InMemoryBroker` in tests
//! - **Prometheus metrics**: built-in observability
//!
//! ## Example
//!
//! ```ignore
//! use kafka_worker::{KafkaConnector, TopicDef, TopicWorker, WorkerConfig};
//!
//! struct MyTopic;
//! impl TopicDef for MyTopic {
//!     const TOPIC: &'static str = "my_topic";
//!     const CONSUMER_GROUP: &'static str = "my_workers";
//! }
//!
//! let config = WorkerConfig::from_topic_def::<MyTopic>();
//! let worker = TopicWorker::new(processor, KafkaConnector::new(), config);
//! worker.start().await;
//! // ...
//! worker.stop().await;
//! ```

mod config;
mod error;
mod kafka;
mod memory;
pub mod metrics;
mod producer;
mod record;
mod registry;
mod worker;

// Re-export main types
pub use config::{FailurePolicy, ProducerConfig, WorkerConfig};
pub use error::{ErrorKind, StreamError};
pub use kafka::{KafkaConnector, KafkaSink, KafkaSource};
pub use memory::{InMemoryBroker, InMemorySource};
pub use metrics::{TopicMetrics, init_metrics};
pub use producer::TopicProducer;
pub use record::{Connector, Delivery, Record, RecordSink, RecordSource};
pub use registry::{TopicDef, TopicMessage};
pub use worker::{ConsumerState, TopicProcessor, TopicWorker};
