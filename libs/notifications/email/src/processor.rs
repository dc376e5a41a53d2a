//! EmailProcessor - turns an envelope into a delivered email
//!
//! Validate the required fields, render the named template with the
//! envelope context, derive the text body, hand both to the mail transport.
//! Used by the consumer loop (`TopicProcessor`) and directly by the
//! fallback dispatcher and `send_test_email`.

use crate::envelope::Envelope;
use crate::error::{NotificationError, NotificationResult};
use crate::models::OutgoingEmail;
use crate::provider::MailTransport;
use crate::templates::{strip_tags, TemplateEngine, TemplateRenderer};
use async_trait::async_trait;
use kafka_worker::{StreamError, TopicProcessor};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Email processor that renders envelopes and sends them through a transport
pub struct EmailProcessor<T: MailTransport, R: TemplateRenderer = TemplateEngine> {
    transport: Arc<T>,
    templates: Arc<R>,
    from_address: String,
}

impl<T: MailTransport, R: TemplateRenderer> EmailProcessor<T, R> {
    /// Create a new EmailProcessor
    pub fn new(transport: T, templates: R, from_address: impl Into<String>) -> Self {
        Self::from_arcs(Arc::new(transport), Arc::new(templates), from_address)
    }

    /// Create from shared transport and templates
    pub fn from_arcs(transport: Arc<T>, templates: Arc<R>, from_address: impl Into<String>) -> Self {
        Self {
            transport,
            templates,
            from_address: from_address.into(),
        }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn from_address(&self) -> &str {
        &self.from_address
    }

    /// Validate and render an envelope into a sendable email
    pub fn render(&self, envelope: &Envelope) -> NotificationResult<OutgoingEmail> {
        envelope.validate()?;

        let html_body = self
            .templates
            .render(&format_template_path(envelope.template()), envelope.context())?;
        let text_body = strip_tags(&html_body);

        Ok(OutgoingEmail {
            subject: envelope.subject().to_string(),
            html_body,
            text_body,
            from: self.from_address.clone(),
            to: vec![envelope.recipient().to_string()],
        })
    }

    /// Render and send, reporting why it failed
    pub async fn try_process(&self, envelope: &Envelope) -> NotificationResult<()> {
        let email = self.render(envelope)?;

        debug!(
            message_id = %envelope.message_id(),
            template = %envelope.template(),
            "Sending email"
        );

        self.transport
            .send(&email)
            .await
            .map_err(|e| NotificationError::Transport(format!("{e:#}")))
    }

    /// Render and send one envelope. Never fails: the outcome is logged
    /// and returned as a bool.
    pub async fn process_one(&self, envelope: &Envelope) -> bool {
        match self.try_process(envelope).await {
            Ok(()) => {
                info!(
                    message_id = %envelope.message_id(),
                    email_type = %envelope.kind().as_str(),
                    recipient = %envelope.recipient(),
                    subject = %envelope.subject(),
                    "Email sent"
                );
                true
            }
            Err(e) => {
                error!(
                    message_id = %envelope.message_id(),
                    email_type = %envelope.kind().as_str(),
                    recipient = %envelope.recipient(),
                    error = %e,
                    "Failed to process email"
                );
                false
            }
        }
    }
}

/// Templates may be named with or without the `emails/` folder prefix
fn format_template_path(template: &str) -> String {
    template
        .strip_prefix("emails/")
        .unwrap_or(template)
        .to_string()
}

#[async_trait]
impl<T, R> TopicProcessor<Envelope> for EmailProcessor<T, R>
where
    T: MailTransport + 'static,
    R: TemplateRenderer + 'static,
{
    async fn process(&self, envelope: &Envelope) -> Result<(), StreamError> {
        debug!(
            message_id = %envelope.message_id(),
            email_type = %envelope.kind().as_str(),
            priority = %envelope.priority().as_str(),
            "Processing email envelope"
        );
        self.try_process(envelope).await.map_err(StreamError::from)
    }

    fn name(&self) -> &'static str {
        "email_processor"
    }
}
