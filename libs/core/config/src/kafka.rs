use crate::{env_or_default, env_parse, ConfigError, FromEnv};

/// Kafka connection settings for the email pipeline
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KafkaConfig {
    pub bootstrap_servers: String,
    pub email_topic: String,
    pub consumer_group: String,
    pub auto_offset_reset: String,
    pub enable_auto_commit: bool,
}

impl FromEnv for KafkaConfig {
    /// Reads from environment variables with defaults:
    /// - KAFKA_BOOTSTRAP_SERVERS: localhost:9092
    /// - KAFKA_EMAIL_TOPIC: email_notifications
    /// - KAFKA_CONSUMER_GROUP: email_consumer_group
    /// - KAFKA_AUTO_OFFSET_RESET: earliest
    /// - KAFKA_ENABLE_AUTO_COMMIT: true
    fn from_env() -> Result<Self, ConfigError> {
        let auto_offset_reset = env_or_default("KAFKA_AUTO_OFFSET_RESET", "earliest");
        if !matches!(auto_offset_reset.as_str(), "earliest" | "latest") {
            return Err(ConfigError::ParseError {
                key: "KAFKA_AUTO_OFFSET_RESET".to_string(),
                details: format!("expected 'earliest' or 'latest', got '{}'", auto_offset_reset),
            });
        }

        Ok(Self {
            bootstrap_servers: env_or_default("KAFKA_BOOTSTRAP_SERVERS", "localhost:9092"),
            email_topic: env_or_default("KAFKA_EMAIL_TOPIC", "email_notifications"),
            consumer_group: env_or_default("KAFKA_CONSUMER_GROUP", "email_consumer_group"),
            auto_offset_reset,
            enable_auto_commit: env_parse("KAFKA_ENABLE_AUTO_COMMIT", true)?,
        })
    }
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:9092".to_string(),
            email_topic: "email_notifications".to_string(),
            consumer_group: "email_consumer_group".to_string(),
            auto_offset_reset: "earliest".to_string(),
            enable_auto_commit: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 5] = [
        "KAFKA_BOOTSTRAP_SERVERS",
        "KAFKA_EMAIL_TOPIC",
        "KAFKA_CONSUMER_GROUP",
        "KAFKA_AUTO_OFFSET_RESET",
        "KAFKA_ENABLE_AUTO_COMMIT",
    ];

    #[test]
    fn test_kafka_config_defaults() {
        temp_env::with_vars_unset(VARS, || {
            let config = KafkaConfig::from_env().unwrap();
            assert_eq!(config, KafkaConfig::default());
        });
    }

    #[test]
    fn test_kafka_config_from_env() {
        temp_env::with_vars(
            [
                ("KAFKA_BOOTSTRAP_SERVERS", Some("kafka-1:9092,kafka-2:9092")),
                ("KAFKA_EMAIL_TOPIC", Some("emails")),
                ("KAFKA_CONSUMER_GROUP", Some("mailers")),
                ("KAFKA_AUTO_OFFSET_RESET", Some("latest")),
                ("KAFKA_ENABLE_AUTO_COMMIT", Some("false")),
            ],
            || {
                let config = KafkaConfig::from_env().unwrap();
                assert_eq!(config.bootstrap_servers, "kafka-1:9092,kafka-2:9092");
                assert_eq!(config.email_topic, "emails");
                assert_eq!(config.consumer_group, "mailers");
                assert_eq!(config.auto_offset_reset, "latest");
                assert!(!config.enable_auto_commit);
            },
        );
    }

    #[test]
    fn test_kafka_config_invalid_offset_reset() {
        temp_env::with_var("KAFKA_AUTO_OFFSET_RESET", Some("middle"), || {
            let err = KafkaConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("KAFKA_AUTO_OFFSET_RESET"));
        });
    }

    #[test]
    fn test_kafka_config_invalid_auto_commit() {
        temp_env::with_vars(
            [
                ("KAFKA_AUTO_OFFSET_RESET", None),
                ("KAFKA_ENABLE_AUTO_COMMIT", Some("sometimes")),
            ],
            || {
                let err = KafkaConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("KAFKA_ENABLE_AUTO_COMMIT"));
            },
        );
    }
}
