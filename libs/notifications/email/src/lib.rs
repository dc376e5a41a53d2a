//! Email notification library with Kafka support
//!
//! Request handlers queue email envelopes on a Kafka topic; a background
//! consumer renders them with Handlebars and delivers them over SMTP.
//!
//! ## Components
//!
//! - **Envelope**: `Envelope`, `EnvelopeType` - the wire message
//! - **Producer**: `EmailProducer` publishes envelopes and reports a bool
//! - **Consumer**: `EmailConsumer` runs the poll loop with `start`/`stop`
//! - **Processing**: `EmailProcessor`, `TemplateEngine`, `MailTransport`
//! - **Fallback**: `NotificationDispatcher` sends directly when queueing fails
//!
//! ## Usage
//!
//! ```ignore
//! use email::{EmailConsumer, EmailProcessor, SmtpTransport, TemplateEngine};
//!
//! let processor = EmailProcessor::new(SmtpTransport::from_env()?, TemplateEngine::new()?, from);
//! let consumer = EmailConsumer::from_kafka_config(processor, &kafka);
//! consumer.start().await;
//! shutdown_signal().await;
//! consumer.stop().await;
//! ```

pub mod config;
pub mod consumer;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod models;
pub mod processor;
pub mod producer;
pub mod provider;
pub mod templates;
pub mod topics;

pub use config::EmailSettings;
pub use consumer::EmailConsumer;
pub use dispatch::{DispatchOutcome, NotificationDispatcher};
pub use envelope::{Context, Envelope, EnvelopeType};
pub use error::{NotificationError, NotificationResult};
pub use models::{ContactSubmission, EmailPriority, InquirySubmission, OutgoingEmail, YoutuberSummary};
pub use processor::EmailProcessor;
pub use producer::EmailProducer;
pub use provider::{MailTransport, MockTransport, SmtpConfig, SmtpTransport};
pub use templates::{strip_tags, TemplateEngine, TemplateRenderer};
pub use topics::EmailTopic;
