//! EmailProducer - queue email envelopes on the notification topic
//!
//! Every operation resolves to a bool: the caller (a request handler)
//! decides what to do when queueing fails, usually by sending directly.

use crate::envelope::{Context, Envelope};
use crate::error::NotificationResult;
use crate::models::{ContactSubmission, EmailPriority, InquirySubmission, YoutuberSummary};
use core_config::kafka::KafkaConfig;
use kafka_worker::{Delivery, KafkaSink, ProducerConfig, RecordSink, TopicMessage, TopicProducer};
use tracing::{error, info, warn};

/// Publishes email envelopes to the broker
pub struct EmailProducer<S: RecordSink = KafkaSink> {
    inner: TopicProducer<S>,
}

impl EmailProducer<KafkaSink> {
    /// Producer for the configured brokers and email topic
    pub fn connect(kafka: &KafkaConfig) -> NotificationResult<Self> {
        let config = ProducerConfig::from_kafka_config(kafka);
        let sink = KafkaSink::new(&config)?;
        info!(
            bootstrap_servers = %config.bootstrap_servers,
            topic = %config.topic,
            "Email producer created"
        );
        Ok(Self::new(sink, config))
    }
}

impl<S: RecordSink> EmailProducer<S> {
    pub fn new(sink: S, config: ProducerConfig) -> Self {
        Self {
            inner: TopicProducer::new(sink, config),
        }
    }

    pub fn from_producer(inner: TopicProducer<S>) -> Self {
        Self { inner }
    }

    pub fn topic(&self) -> &str {
        self.inner.topic()
    }

    /// Queue the confirmation for a contact form submission
    pub async fn send_contact_confirmation_email(&self, contact: &ContactSubmission) -> bool {
        self.publish(&Envelope::contact_confirmation(contact)).await
    }

    /// Queue the confirmation for an inquiry about a creator
    pub async fn send_youtuber_inquiry_email(
        &self,
        inquiry: &InquirySubmission,
        youtuber: &YoutuberSummary,
    ) -> bool {
        self.publish(&Envelope::youtuber_inquiry(inquiry, youtuber))
            .await
    }

    /// Queue an email for any registered template
    pub async fn send_custom_email(
        &self,
        recipient: &str,
        subject: &str,
        template: &str,
        context: Context,
        priority: EmailPriority,
    ) -> bool {
        self.publish(&Envelope::custom(
            recipient, subject, template, context, priority,
        ))
        .await
    }

    /// Publish an envelope and wait for the acknowledgment.
    ///
    /// `false` when the envelope is invalid, the broker is unreachable or
    /// the acknowledgment does not arrive within the configured bound.
    pub async fn publish(&self, envelope: &Envelope) -> bool {
        match self.try_publish(envelope).await {
            Ok(_) => true,
            Err(e) => {
                error!(
                    message_id = %envelope.message_id(),
                    email_type = %envelope.label(),
                    topic = %self.inner.topic(),
                    error = %e,
                    "Failed to queue email"
                );
                false
            }
        }
    }

    /// Publish an envelope, reporting why it failed
    pub async fn try_publish(&self, envelope: &Envelope) -> NotificationResult<Delivery> {
        envelope.validate()?;
        Ok(self.inner.send(envelope).await?)
    }

    /// Flush pending messages, then drop this handle to the client
    pub async fn close(self) {
        match self.inner.flush().await {
            Ok(()) => info!(topic = %self.inner.topic(), "Email producer closed"),
            Err(e) => warn!(error = %e, "Email producer flush failed on close"),
        }
    }
}

impl<S: RecordSink> Clone for EmailProducer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
