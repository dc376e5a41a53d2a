//! EmailConsumer - background service draining the email topic
//!
//! Wraps a `TopicWorker` running the `EmailProcessor`. Offsets are
//! committed after every handled envelope, whether it was delivered or
//! not, so a failing envelope is logged and never redelivered.

use crate::envelope::Envelope;
use crate::processor::EmailProcessor;
use crate::provider::MailTransport;
use crate::templates::{TemplateEngine, TemplateRenderer};
use core_config::kafka::KafkaConfig;
use kafka_worker::{Connector, ConsumerState, KafkaConnector, TopicWorker, WorkerConfig};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Long-running email delivery service
pub struct EmailConsumer<T, C = KafkaConnector, R = TemplateEngine>
where
    T: MailTransport + 'static,
    C: Connector,
    R: TemplateRenderer + 'static,
{
    worker: TopicWorker<Envelope, EmailProcessor<T, R>, C>,
}

impl<T, R> EmailConsumer<T, KafkaConnector, R>
where
    T: MailTransport + 'static,
    R: TemplateRenderer + 'static,
{
    /// Consumer for the configured brokers, topic and group
    pub fn from_kafka_config(processor: EmailProcessor<T, R>, kafka: &KafkaConfig) -> Self {
        Self::new(
            processor,
            KafkaConnector::new(),
            WorkerConfig::from_kafka_config(kafka),
        )
    }
}

impl<T, C, R> EmailConsumer<T, C, R>
where
    T: MailTransport + 'static,
    C: Connector,
    R: TemplateRenderer + 'static,
{
    pub fn new(processor: EmailProcessor<T, R>, connector: C, config: WorkerConfig) -> Self {
        Self::with_arc_processor(Arc::new(processor), connector, config)
    }

    /// Share the processor with a fallback dispatcher
    pub fn with_arc_processor(
        processor: Arc<EmailProcessor<T, R>>,
        connector: C,
        config: WorkerConfig,
    ) -> Self {
        Self {
            worker: TopicWorker::with_arc_processor(processor, connector, config),
        }
    }

    pub fn processor(&self) -> &Arc<EmailProcessor<T, R>> {
        self.worker.processor()
    }

    pub fn config(&self) -> &WorkerConfig {
        self.worker.config()
    }

    /// Connect and begin consuming. `false` if the broker is unreachable.
    pub async fn start(&self) -> bool {
        self.worker.start().await
    }

    /// Finish the in-flight batch and disconnect
    pub async fn stop(&self) {
        self.worker.stop().await
    }

    pub fn state(&self) -> ConsumerState {
        self.worker.state()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConsumerState> {
        self.worker.subscribe_state()
    }

    /// Deliver one envelope outside the poll loop
    pub async fn process_one(&self, envelope: &Envelope) -> bool {
        self.processor().process_one(envelope).await
    }

    /// Deliver a synthetic contact confirmation to `recipient`, bypassing
    /// the broker
    pub async fn send_test_email(&self, recipient: &str) -> bool {
        let envelope = Envelope::test_email(recipient);
        info!(
            recipient = %recipient,
            message_id = %envelope.message_id(),
            "Sending test email"
        );
        self.process_one(&envelope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockTransport;
    use crate::topics::EmailTopic;
    use kafka_worker::InMemoryBroker;

    fn consumer(transport: MockTransport) -> EmailConsumer<MockTransport, InMemoryBroker> {
        let processor = EmailProcessor::new(
            transport,
            TemplateEngine::new().unwrap(),
            "noreply@example.com",
        );
        EmailConsumer::new(
            processor,
            InMemoryBroker::new(),
            WorkerConfig::from_topic_def::<EmailTopic>(),
        )
    }

    #[tokio::test]
    async fn test_send_test_email() {
        let transport = MockTransport::new();
        let consumer = consumer(transport.clone());

        assert!(consumer.send_test_email("ops@example.com").await);

        let sent = transport.sent_emails().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].is_addressed_to("ops@example.com"));
        assert!(sent[0].subject.starts_with("Test Email"));
        assert!(sent[0].html_body.contains("Hi Test User"));
        assert_eq!(consumer.state(), ConsumerState::Uninitialized);
    }

    #[tokio::test]
    async fn test_send_test_email_reports_failure() {
        let consumer = consumer(MockTransport::failing("smtp down"));
        assert!(!consumer.send_test_email("ops@example.com").await);
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let consumer = consumer(MockTransport::new());
        consumer.stop().await;
        assert_eq!(consumer.state(), ConsumerState::Uninitialized);
    }

    #[tokio::test]
    async fn test_start_stop() {
        let consumer = consumer(MockTransport::new());
        assert!(consumer.start().await);
        assert!(consumer.is_running());
        consumer.stop().await;
        assert_eq!(consumer.state(), ConsumerState::Stopped);
    }
}
