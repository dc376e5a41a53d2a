//! Email Worker Service (Kafka)
//!
//! Binary entry point for the Kafka-based email worker.

use clap::Parser;
use core_config::tracing::install_color_eyre;
use creators_email_worker::Cli;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();
    creators_email_worker::run(Cli::parse()).await
}
