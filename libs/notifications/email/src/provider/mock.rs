//! Mock mail transport for testing

use super::MailTransport;
use crate::models::OutgoingEmail;
use async_trait::async_trait;
use eyre::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Mock transport that captures sent emails. Clones share the captured list.
#[derive(Clone)]
pub struct MockTransport {
    sent_emails: Arc<Mutex<Vec<OutgoingEmail>>>,
    attempts: Arc<Mutex<usize>>,
    failure_message: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self {
            sent_emails: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(Mutex::new(0)),
            failure_message: None,
        }
    }

    /// Create a mock transport that always fails
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure_message: Some(message.into()),
            ..Self::new()
        }
    }

    /// Get all sent emails
    pub async fn sent_emails(&self) -> Vec<OutgoingEmail> {
        self.sent_emails.lock().await.clone()
    }

    /// Get the count of sent emails
    pub async fn sent_count(&self) -> usize {
        self.sent_emails.lock().await.len()
    }

    /// Number of `send` calls, including failed ones
    pub async fn attempts(&self) -> usize {
        *self.attempts.lock().await
    }

    /// Clear all sent emails
    pub async fn clear(&self) {
        self.sent_emails.lock().await.clear();
    }

    /// Check if an email was sent to a specific address
    pub async fn was_sent_to(&self, address: &str) -> bool {
        self.sent_emails
            .lock()
            .await
            .iter()
            .any(|e| e.is_addressed_to(address))
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailTransport for MockTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        *self.attempts.lock().await += 1;

        if let Some(message) = &self.failure_message {
            return Err(eyre::eyre!("{message}"));
        }

        self.sent_emails.lock().await.push(email.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        if self.failure_message.is_some() {
            return Err(eyre::eyre!("Mock health check failed"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &str) -> OutgoingEmail {
        OutgoingEmail {
            subject: "Test Subject".into(),
            html_body: "<p>Test body</p>".into(),
            text_body: "Test body".into(),
            from: "noreply@example.com".into(),
            to: vec![to.into()],
        }
    }

    #[tokio::test]
    async fn test_mock_transport_sends_email() {
        let transport = MockTransport::new();

        transport.send(&email("test@example.com")).await.unwrap();

        let sent = transport.sent_emails().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["test@example.com".to_string()]);
        assert!(transport.was_sent_to("test@example.com").await);
        assert!(!transport.was_sent_to("other@example.com").await);
    }

    #[tokio::test]
    async fn test_mock_transport_fails() {
        let transport = MockTransport::failing("Simulated failure");

        let result = transport.send(&email("test@example.com")).await;
        assert!(result.unwrap_err().to_string().contains("Simulated failure"));
        assert_eq!(transport.sent_count().await, 0);
        assert_eq!(transport.attempts().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_captures() {
        let transport = MockTransport::new();
        let clone = transport.clone();

        clone.send(&email("a@b.com")).await.unwrap();
        assert_eq!(transport.sent_count().await, 1);

        transport.clear().await;
        assert_eq!(clone.sent_count().await, 0);
    }
}
