//! Worker configuration

use core_config::kafka::KafkaConfig;
use core_config::{env_or_default, env_parse, ConfigError, FromEnv};
use email::EmailSettings;

/// Everything the worker reads from the environment at startup
#[derive(Clone, Debug)]
pub struct Config {
    pub kafka: KafkaConfig,
    pub email: EmailSettings,
    /// Prometheus exporter port; no exporter when unset
    pub metrics_port: Option<u16>,
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        let metrics_port = if env_or_default("METRICS_PORT", "").trim().is_empty() {
            None
        } else {
            Some(env_parse("METRICS_PORT", 0u16)?)
        };

        Ok(Self {
            kafka: KafkaConfig::from_env()?,
            email: EmailSettings::from_env()?,
            metrics_port,
        })
    }
}
