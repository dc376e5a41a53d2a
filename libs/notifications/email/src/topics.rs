//! Topic definition for email notifications.

use kafka_worker::TopicDef;

/// The email notification topic.
///
/// Producers and the consumer share these names unless overridden by
/// `KAFKA_EMAIL_TOPIC` / `KAFKA_CONSUMER_GROUP`.
pub struct EmailTopic;

impl TopicDef for EmailTopic {
    const TOPIC: &'static str = "email_notifications";
    const CONSUMER_GROUP: &'static str = "email_consumer_group";
}
