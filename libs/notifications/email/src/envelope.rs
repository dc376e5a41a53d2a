//! Envelope - the message carried on the email topic
//!
//! Producers build envelopes from domain payloads; the consumer decodes them,
//! validates the required fields and renders the named template with the
//! embedded context.
//!
//! Wire format (JSON):
//!
//! ```json
//! {
//!   "type": "contact_confirmation",
//!   "template": "contact_confirmation.html",
//!   "recipient": "a@b.com",
//!   "subject": "Thank You for Contacting Us - YouTubers Modern",
//!   "context": { "first_name": "Ada", "created_date": "2024-05-01T10:00:00+00:00" },
//!   "priority": "normal",
//!   "created_at": "2024-05-01T10:00:00+00:00",
//!   "message_id": "contact_42_1714557600"
//! }
//! ```
//!
//! `message_id` has second granularity and is not checked for collisions;
//! two envelopes built for the same record within one second share an id.

use crate::error::{NotificationError, NotificationResult};
use crate::models::{ContactSubmission, EmailPriority, InquirySubmission, YoutuberSummary};
use chrono::{DateTime, Utc};
use kafka_worker::TopicMessage;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Template context: string keys to JSON values, dates as RFC 3339 strings
pub type Context = serde_json::Map<String, Value>;

pub const CONTACT_TEMPLATE: &str = "contact_confirmation.html";
pub const YOUTUBER_INQUIRY_TEMPLATE: &str = "youtuber_contact_confirmation.html";

const SITE_NAME: &str = "YouTubers Modern";

/// Kind of notification. Used for logging and metrics; the template field
/// decides what gets rendered.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeType {
    ContactConfirmation,
    YoutuberInquiryConfirmation,
    #[default]
    CustomEmail,
    TestEmail,
}

impl EnvelopeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeType::ContactConfirmation => "contact_confirmation",
            EnvelopeType::YoutuberInquiryConfirmation => "youtuber_inquiry_confirmation",
            EnvelopeType::CustomEmail => "custom_email",
            EnvelopeType::TestEmail => "test_email",
        }
    }
}

/// Email notification envelope. Immutable once built.
///
/// Decoding is lenient: missing or `null` fields take their defaults and
/// a missing `created_at` becomes the decode time. Only `validate` decides
/// whether an envelope can be delivered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    kind: EnvelopeType,
    #[serde(default, deserialize_with = "null_as_default")]
    template: String,
    #[serde(default, deserialize_with = "null_as_default")]
    recipient: String,
    #[serde(default, deserialize_with = "null_as_default")]
    subject: String,
    #[serde(default, deserialize_with = "null_as_default")]
    context: Context,
    #[serde(default, deserialize_with = "null_as_default")]
    priority: EmailPriority,
    #[serde(default = "Utc::now", with = "timestamp")]
    created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    message_id: String,
}

impl Envelope {
    /// Confirmation for a submitted contact form
    pub fn contact_confirmation(contact: &ContactSubmission) -> Self {
        Self::contact_confirmation_at(contact, Utc::now())
    }

    pub fn contact_confirmation_at(contact: &ContactSubmission, now: DateTime<Utc>) -> Self {
        let context = context([
            ("first_name", contact.first_name.as_str().into()),
            ("last_name", contact.last_name.as_str().into()),
            ("email", contact.email.as_str().into()),
            ("phone", contact.phone.as_str().into()),
            ("city", contact.city.as_str().into()),
            ("state", contact.state.as_str().into()),
            ("subject", contact.subject.as_str().into()),
            ("message", contact.message.as_str().into()),
            ("created_date", contact.created_date.to_rfc3339().into()),
        ]);

        Self {
            kind: EnvelopeType::ContactConfirmation,
            template: CONTACT_TEMPLATE.to_string(),
            recipient: contact.email.clone(),
            subject: format!("Thank You for Contacting Us - {SITE_NAME}"),
            context,
            priority: EmailPriority::Normal,
            created_at: now,
            message_id: format!("contact_{}_{}", contact.id, now.timestamp()),
        }
    }

    /// Confirmation for an inquiry about a creator
    pub fn youtuber_inquiry(inquiry: &InquirySubmission, youtuber: &YoutuberSummary) -> Self {
        Self::youtuber_inquiry_at(inquiry, youtuber, Utc::now())
    }

    pub fn youtuber_inquiry_at(
        inquiry: &InquirySubmission,
        youtuber: &YoutuberSummary,
        now: DateTime<Utc>,
    ) -> Self {
        let context = context([
            ("first_name", inquiry.first_name.as_str().into()),
            ("last_name", inquiry.last_name.as_str().into()),
            ("email", inquiry.email.as_str().into()),
            ("phone", inquiry.phone.as_str().into()),
            ("message", inquiry.message.as_str().into()),
            ("youtuber_name", youtuber.name.as_str().into()),
            ("youtuber_category", youtuber.category.as_str().into()),
            ("youtuber_id", youtuber.id.into()),
            ("created_date", inquiry.created_date.to_rfc3339().into()),
        ]);

        Self {
            kind: EnvelopeType::YoutuberInquiryConfirmation,
            template: YOUTUBER_INQUIRY_TEMPLATE.to_string(),
            recipient: inquiry.email.clone(),
            subject: format!("Your Inquiry About {} - {SITE_NAME}", youtuber.name),
            context,
            priority: EmailPriority::High,
            created_at: now,
            message_id: format!("youtuber_inquiry_{}_{}", inquiry.id, now.timestamp()),
        }
    }

    /// Arbitrary template email
    pub fn custom(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        template: impl Into<String>,
        context: Context,
        priority: EmailPriority,
    ) -> Self {
        Self::custom_at(recipient, subject, template, context, priority, Utc::now())
    }

    pub fn custom_at(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        template: impl Into<String>,
        context: Context,
        priority: EmailPriority,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: EnvelopeType::CustomEmail,
            template: template.into(),
            recipient: recipient.into(),
            subject: subject.into(),
            context,
            priority,
            created_at: now,
            message_id: format!("custom_{}", now.timestamp()),
        }
    }

    /// Synthetic envelope used to verify mail configuration
    pub fn test_email(recipient: impl Into<String>) -> Self {
        Self::test_email_at(recipient, Utc::now())
    }

    pub fn test_email_at(recipient: impl Into<String>, now: DateTime<Utc>) -> Self {
        let recipient = recipient.into();
        let context = context([
            ("first_name", "Test".into()),
            ("last_name", "User".into()),
            ("email", recipient.as_str().into()),
            ("phone", "+1 (234) 567-8900".into()),
            ("city", "Test City".into()),
            ("state", "Test State".into()),
            ("subject", "Test Email Subject".into()),
            (
                "message",
                "This is a test email to verify the email service is working correctly.".into(),
            ),
            ("created_date", now.to_rfc3339().into()),
        ]);

        Self {
            kind: EnvelopeType::TestEmail,
            template: CONTACT_TEMPLATE.to_string(),
            recipient,
            subject: format!("Test Email - {SITE_NAME} Email Service"),
            context,
            priority: EmailPriority::Normal,
            created_at: now,
            message_id: format!("test_email_{}", now.timestamp()),
        }
    }

    pub fn kind(&self) -> EnvelopeType {
        self.kind
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn priority(&self) -> EmailPriority {
        self.priority
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Broker key: `{type}_{source id}` for domain events, `{type}_{recipient}`
    /// for custom and test emails
    pub fn partition_key(&self) -> String {
        match self.kind {
            EnvelopeType::ContactConfirmation | EnvelopeType::YoutuberInquiryConfirmation => self
                .message_id
                .rsplit_once('_')
                .map(|(prefix, _)| prefix.to_string())
                .unwrap_or_else(|| self.message_id.clone()),
            EnvelopeType::CustomEmail => format!("custom_{}", self.recipient),
            EnvelopeType::TestEmail => format!("test_email_{}", self.recipient),
        }
    }

    /// Check that recipient, subject and template are present
    pub fn validate(&self) -> NotificationResult<()> {
        let missing: Vec<&str> = [
            ("recipient", &self.recipient),
            ("subject", &self.subject),
            ("template", &self.template),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(NotificationError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

impl TopicMessage for Envelope {
    fn message_id(&self) -> &str {
        &self.message_id
    }

    fn partition_key(&self) -> String {
        Envelope::partition_key(self)
    }

    fn label(&self) -> &'static str {
        self.kind.as_str()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn context<const N: usize>(pairs: [(&str, Value); N]) -> Context {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// RFC 3339 on the way out. On the way in, timestamps without an offset
/// are read as UTC and `null` is the decode time.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(Utc::now());
        };
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| D::Error::custom(format!("invalid created_at '{raw}': {e}")))
    }
}
