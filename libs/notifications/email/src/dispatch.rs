//! Fallback dispatch for request handlers
//!
//! A submission handler must never fail because email is unavailable.
//! The dispatcher queues the envelope when a producer is configured and
//! the broker acknowledges it; otherwise it renders and sends in-process.

use crate::envelope::Envelope;
use crate::models::{ContactSubmission, InquirySubmission, YoutuberSummary};
use crate::processor::EmailProcessor;
use crate::producer::EmailProducer;
use crate::provider::MailTransport;
use crate::templates::{TemplateEngine, TemplateRenderer};
use kafka_worker::{KafkaSink, RecordSink};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// How an envelope left the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Acknowledged by the broker
    Queued,
    /// Broker unavailable, delivered in-process
    SentDirectly,
    /// Neither path delivered it
    Failed,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::SentDirectly => "sent_directly",
            Self::Failed => "failed",
        }
    }

    /// Whether the email was handed off by either path
    pub fn is_delivered(&self) -> bool {
        !matches!(self, Self::Failed)
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queue-first email dispatch with a direct-send fallback
pub struct NotificationDispatcher<T, S = KafkaSink, R = TemplateEngine>
where
    T: MailTransport,
    S: RecordSink,
    R: TemplateRenderer,
{
    producer: Option<EmailProducer<S>>,
    direct: Arc<EmailProcessor<T, R>>,
}

impl<T, S, R> NotificationDispatcher<T, S, R>
where
    T: MailTransport,
    S: RecordSink,
    R: TemplateRenderer,
{
    pub fn new(producer: Option<EmailProducer<S>>, direct: Arc<EmailProcessor<T, R>>) -> Self {
        Self { producer, direct }
    }

    /// Dispatcher without a broker: every envelope is sent directly
    pub fn direct_only(direct: Arc<EmailProcessor<T, R>>) -> Self {
        Self::new(None, direct)
    }

    pub fn has_producer(&self) -> bool {
        self.producer.is_some()
    }

    /// Queue the envelope, falling back to a direct send. Never fails.
    pub async fn dispatch(&self, envelope: &Envelope) -> DispatchOutcome {
        if let Some(producer) = &self.producer {
            if producer.publish(envelope).await {
                return DispatchOutcome::Queued;
            }
            warn!(
                message_id = %envelope.message_id(),
                "Queueing failed, sending email directly"
            );
        }

        let outcome = if self.direct.process_one(envelope).await {
            DispatchOutcome::SentDirectly
        } else {
            DispatchOutcome::Failed
        };

        match outcome {
            DispatchOutcome::Failed => error!(
                message_id = %envelope.message_id(),
                recipient = %envelope.recipient(),
                "Email could not be queued or sent"
            ),
            _ => info!(
                message_id = %envelope.message_id(),
                outcome = %outcome,
                "Email dispatched"
            ),
        }
        outcome
    }

    /// Confirmation for a newly stored contact submission
    pub async fn notify_contact_submitted(&self, contact: &ContactSubmission) -> DispatchOutcome {
        self.dispatch(&Envelope::contact_confirmation(contact)).await
    }

    /// Confirmation for a newly stored creator inquiry
    pub async fn notify_inquiry_submitted(
        &self,
        inquiry: &InquirySubmission,
        youtuber: &YoutuberSummary,
    ) -> DispatchOutcome {
        self.dispatch(&Envelope::youtuber_inquiry(inquiry, youtuber))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockTransport;
    use chrono::Utc;
    use kafka_worker::{InMemoryBroker, ProducerConfig};

    const TOPIC: &str = "email_notifications";

    fn direct(transport: &MockTransport) -> Arc<EmailProcessor<MockTransport>> {
        Arc::new(EmailProcessor::new(
            transport.clone(),
            TemplateEngine::new().unwrap(),
            "noreply@example.com",
        ))
    }

    fn dispatcher(
        broker: &InMemoryBroker,
        transport: &MockTransport,
    ) -> NotificationDispatcher<MockTransport, InMemoryBroker> {
        let producer = EmailProducer::new(broker.clone(), ProducerConfig::new(TOPIC));
        NotificationDispatcher::new(Some(producer), direct(transport))
    }

    fn contact() -> ContactSubmission {
        ContactSubmission {
            id: 9,
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            email: "grace@example.com".into(),
            phone: String::new(),
            city: String::new(),
            state: String::new(),
            subject: "Question".into(),
            message: "Hello".into(),
            created_date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_queued_when_broker_acks() {
        let broker = InMemoryBroker::new();
        let transport = MockTransport::new();
        let dispatcher = dispatcher(&broker, &transport);

        let outcome = dispatcher.notify_contact_submitted(&contact()).await;

        assert_eq!(outcome, DispatchOutcome::Queued);
        assert_eq!(broker.published(TOPIC).await.len(), 1);
        assert_eq!(transport.attempts().await, 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_direct_send() {
        let broker = InMemoryBroker::new();
        broker.set_reachable(false).await;
        let transport = MockTransport::new();
        let dispatcher = dispatcher(&broker, &transport);

        let outcome = dispatcher.notify_contact_submitted(&contact()).await;

        assert_eq!(outcome, DispatchOutcome::SentDirectly);
        assert!(transport.was_sent_to("grace@example.com").await);
    }

    #[tokio::test]
    async fn test_direct_only() {
        let transport = MockTransport::new();
        let dispatcher: NotificationDispatcher<MockTransport, InMemoryBroker> =
            NotificationDispatcher::direct_only(direct(&transport));

        assert!(!dispatcher.has_producer());
        let outcome = dispatcher.notify_contact_submitted(&contact()).await;
        assert_eq!(outcome, DispatchOutcome::SentDirectly);
    }

    #[tokio::test]
    async fn test_failed_when_both_paths_fail() {
        let broker = InMemoryBroker::new();
        broker.set_reachable(false).await;
        let transport = MockTransport::failing("smtp down");
        let dispatcher = dispatcher(&broker, &transport);

        let outcome = dispatcher.notify_contact_submitted(&contact()).await;

        assert_eq!(outcome, DispatchOutcome::Failed);
        assert!(!outcome.is_delivered());
        assert_eq!(transport.attempts().await, 1);
    }
}
