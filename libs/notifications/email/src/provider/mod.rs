//! Mail transport implementations

pub mod mock;
pub mod smtp;

pub use mock::MockTransport;
pub use smtp::{SmtpConfig, SmtpTransport};

use crate::models::OutgoingEmail;
use async_trait::async_trait;
use eyre::Result;

/// Delivers rendered emails
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Send an email
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;

    /// Check that the transport can reach its server
    async fn health_check(&self) -> Result<()>;

    /// Get transport name
    fn name(&self) -> &'static str;
}
