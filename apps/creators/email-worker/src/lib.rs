//! Email Worker Service (Kafka)
//!
//! A background worker that delivers queued email envelopes.
//!
//! ## Architecture
//!
//! ```text
//! Kafka (email_notifications topic)
//!   ↓ (consumer group: email_consumer_group)
//! TopicWorker<Envelope, EmailProcessor>
//!   ↓ (renders templates)
//! TemplateEngine (Handlebars)
//!   ↓ (sends emails)
//! SmtpTransport (lettre)
//!   ↓
//! Email Delivery
//! ```
//!
//! `--test-email <ADDR>` renders and sends one synthetic email without
//! touching the broker, then exits.

pub mod config;

use clap::Parser;
use config::Config;
use core_config::tracing::init_tracing;
use core_config::{Environment, FromEnv};
use email::{EmailConsumer, EmailProcessor, MailTransport, SmtpTransport, TemplateEngine};
use eyre::{bail, Result, WrapErr};
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "creators_email_worker")]
#[command(about = "Deliver queued notification emails from Kafka")]
pub struct Cli {
    /// Send a single test email to this address and exit
    #[arg(long, value_name = "ADDR")]
    pub test_email: Option<String>,
}

/// Run the email worker
///
/// Sets up logging and metrics, picks the mail transport for the
/// environment (configured SMTP relay in production, Mailpit/MailHog in
/// development), then either sends a test email or consumes until SIGINT
/// or SIGTERM.
pub async fn run(cli: Cli) -> Result<()> {
    let environment = Environment::from_env();
    init_tracing(&environment);

    let config = Config::from_env().wrap_err("Invalid worker configuration")?;
    if let Some(port) = config.metrics_port {
        kafka_worker::init_metrics(port);
    }

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        environment = ?environment,
        "Starting email worker service"
    );

    let templates = match &config.email.template_dir {
        Some(dir) => TemplateEngine::from_directory(dir),
        None => TemplateEngine::new(),
    }
    .wrap_err("Failed to initialize template engine")?;

    let transport = if environment.is_production() {
        info!("Using SMTP relay for production");
        SmtpTransport::from_env()
            .wrap_err("SMTP configuration error. Ensure SMTP_HOST is set.")?
    } else {
        info!("Using SMTP for development (Mailpit/MailHog)");
        SmtpTransport::mailhog().wrap_err("SMTP configuration error")?
    };

    serve(transport, templates, &config, cli.test_email).await
}

async fn serve<T: MailTransport + 'static>(
    transport: T,
    templates: TemplateEngine,
    config: &Config,
    test_email: Option<String>,
) -> Result<()> {
    if let Err(e) = transport.health_check().await {
        warn!(transport = transport.name(), error = %e, "Mail transport health check failed");
    }

    let processor = EmailProcessor::new(transport, templates, config.email.from_address.clone());
    let consumer = EmailConsumer::from_kafka_config(processor, &config.kafka);

    if let Some(recipient) = test_email {
        if !consumer.send_test_email(&recipient).await {
            bail!("Failed to send test email to {recipient}");
        }
        info!(recipient = %recipient, "Test email sent");
        return Ok(());
    }

    if !consumer.start().await {
        bail!(
            "Failed to connect to Kafka at {}",
            config.kafka.bootstrap_servers
        );
    }

    info!(
        topic = %config.kafka.email_topic,
        group = %config.kafka.consumer_group,
        "Email worker running"
    );

    shutdown_signal().await;
    consumer.stop().await;

    info!("Email worker service stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_test_email() {
        let cli = Cli::try_parse_from(["creators_email_worker", "--test-email", "ops@example.com"])
            .unwrap();
        assert_eq!(cli.test_email.as_deref(), Some("ops@example.com"));

        let cli = Cli::try_parse_from(["creators_email_worker"]).unwrap();
        assert!(cli.test_email.is_none());
    }
}
