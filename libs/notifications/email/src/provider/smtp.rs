//! SMTP mail transport using lettre

use super::MailTransport;
use crate::models::OutgoingEmail;
use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse, env_required};
use eyre::{Result, WrapErr};
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};

/// SMTP transport configuration
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub use_tls: bool,
}

impl SmtpConfig {
    /// Mailhog/Mailpit (local development): SMTP_HOST or localhost,
    /// SMTP_PORT or 1025, no authentication or TLS
    pub fn mailhog() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_or_default("SMTP_HOST", "localhost"),
            port: env_parse("SMTP_PORT", 1025)?,
            username: String::new(),
            password: String::new(),
            use_tls: false,
        })
    }
}

impl FromEnv for SmtpConfig {
    /// Requires SMTP_HOST. SMTP_PORT defaults to 587, SMTP_USE_TLS to true.
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_required("SMTP_HOST")?,
            port: env_parse("SMTP_PORT", 587)?,
            username: env_or_default("SMTP_USERNAME", ""),
            password: env_or_default("SMTP_PASSWORD", ""),
            use_tls: env_parse("SMTP_USE_TLS", true)?,
        })
    }
}

/// SMTP mail transport
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpTransport {
    /// Create a new SMTP transport
    pub fn new(config: SmtpConfig) -> Result<Self> {
        let transport = if config.use_tls {
            let creds = Credentials::new(config.username.clone(), config.password.clone());
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .wrap_err("Failed to create SMTP relay")?
                .credentials(creds)
                .port(config.port)
                .build()
        } else if !config.username.is_empty() {
            let creds = Credentials::new(config.username.clone(), config.password.clone());
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .credentials(creds)
                .port(config.port)
                .build()
        } else {
            // No auth (for Mailpit/Mailhog)
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
                .port(config.port)
                .build()
        };

        Ok(Self {
            transport,
            host: config.host,
        })
    }

    /// Create a transport for Mailhog/Mailpit (local development)
    pub fn mailhog() -> Result<Self> {
        Self::new(SmtpConfig::mailhog()?)
    }

    /// Create a transport from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(SmtpConfig::from_env()?)
    }
}

/// Build a multipart/alternative message: plain text first, HTML as the alternative
pub(crate) fn build_message(email: &OutgoingEmail) -> Result<Message> {
    let from: Mailbox = email.from.parse().wrap_err("Invalid from address")?;

    let mut builder = Message::builder().from(from).subject(&email.subject);
    for to in &email.to {
        let mailbox: Mailbox = to
            .parse()
            .wrap_err_with(|| format!("Invalid to address: {to}"))?;
        builder = builder.to(mailbox);
    }

    builder
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(email.text_body.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(email.html_body.clone()),
                ),
        )
        .wrap_err("Failed to build multipart message")
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let message = build_message(email)?;

        let response = self
            .transport
            .send(message)
            .await
            .wrap_err("Failed to send email via SMTP")?;

        tracing::debug!(
            host = %self.host,
            code = %response.code(),
            to = ?email.to,
            "SMTP server accepted message"
        );

        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        self.transport
            .test_connection()
            .await
            .wrap_err("SMTP health check failed")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}
