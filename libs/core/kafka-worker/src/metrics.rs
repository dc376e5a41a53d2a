//! Prometheus metrics for topic producers and workers

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

static EXPORTER_INSTALLED: OnceCell<bool> = OnceCell::new();

/// Start the Prometheus exporter on `0.0.0.0:{port}`.
///
/// Call this once at startup; later calls are no-ops. Failure to bind is
/// logged and metrics stay disabled.
pub fn init_metrics(port: u16) -> bool {
    *EXPORTER_INSTALLED.get_or_init(|| {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        match PrometheusBuilder::new().with_http_listener(addr).install() {
            Ok(()) => {
                info!(%addr, "Prometheus exporter listening");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to install Prometheus exporter");
                false
            }
        }
    })
}

/// Outcome label for processed messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Success,
    Failed,
    Skipped,
}

impl MessageStatus {
    fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Success => "success",
            MessageStatus::Failed => "failed",
            MessageStatus::Skipped => "skipped",
        }
    }
}

/// Worker metrics helper
#[derive(Clone)]
pub struct TopicMetrics {
    /// Topic name for labeling
    topic: String,
    /// Processor name for labeling
    processor_name: String,
}

impl TopicMetrics {
    pub fn new(topic: impl Into<String>, processor_name: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            processor_name: processor_name.into(),
        }
    }

    /// Record a message handled by the processor
    pub fn message_processed(&self, label: &'static str, status: MessageStatus, duration: Duration) {
        counter!(
            "kafka_worker_messages_processed_total",
            "topic" => self.topic.clone(),
            "processor" => self.processor_name.clone(),
            "type" => label,
            "status" => status.as_str()
        )
        .increment(1);

        histogram!(
            "kafka_worker_message_duration_seconds",
            "topic" => self.topic.clone(),
            "processor" => self.processor_name.clone()
        )
        .record(duration.as_secs_f64());
    }

    /// Record a record that could not be decoded
    pub fn message_undecodable(&self) {
        counter!(
            "kafka_worker_messages_processed_total",
            "topic" => self.topic.clone(),
            "processor" => self.processor_name.clone(),
            "type" => "unknown",
            "status" => MessageStatus::Skipped.as_str()
        )
        .increment(1);
    }

    /// Record a failed poll
    pub fn poll_failed(&self, kind: &'static str) {
        counter!(
            "kafka_worker_poll_errors_total",
            "topic" => self.topic.clone(),
            "kind" => kind
        )
        .increment(1);
    }
}

/// Record a publish attempt
pub fn message_published(topic: &str, label: &'static str, success: bool) {
    counter!(
        "kafka_worker_messages_published_total",
        "topic" => topic.to_string(),
        "type" => label,
        "status" => if success { "success" } else { "failed" }
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = TopicMetrics::new("test_topic", "test_processor");
        assert_eq!(metrics.topic, "test_topic");
        assert_eq!(metrics.processor_name, "test_processor");
    }

    #[test]
    fn test_recording_without_exporter_is_noop() {
        let metrics = TopicMetrics::new("test_topic", "test_processor");
        metrics.message_processed("custom_email", MessageStatus::Success, Duration::from_millis(5));
        metrics.poll_failed("connection");
        message_published("test_topic", "custom_email", false);
    }
}
