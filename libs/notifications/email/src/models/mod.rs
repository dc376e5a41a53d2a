use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Email priority carried on the envelope. Advisory only: it does not
/// change partitioning or processing order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmailPriority {
    High,
    #[default]
    Normal,
    Low,
}

impl EmailPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailPriority::High => "high",
            EmailPriority::Normal => "normal",
            EmailPriority::Low => "low",
        }
    }
}

/// A rendered email handed to a mail transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    pub from: String,
    pub to: Vec<String>,
}

impl OutgoingEmail {
    /// Whether `address` is among the recipients
    pub fn is_addressed_to(&self, address: &str) -> bool {
        self.to.iter().any(|to| to == address)
    }
}

/// A submitted contact form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactSubmission {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    pub created_date: DateTime<Utc>,
}

/// A submitted inquiry about a specific creator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InquirySubmission {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub inquiry_type: String,
    #[serde(default)]
    pub budget_range: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    pub created_date: DateTime<Utc>,
}

/// The creator an inquiry is about
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct YoutuberSummary {
    pub id: i64,
    pub name: String,
    pub category: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_wire_format() {
        assert_eq!(serde_json::to_string(&EmailPriority::High).unwrap(), "\"high\"");
        let low: EmailPriority = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(low, EmailPriority::Low);
        assert_eq!(EmailPriority::default(), EmailPriority::Normal);
    }

    #[test]
    fn test_is_addressed_to() {
        let email = OutgoingEmail {
            subject: "Hi".into(),
            html_body: "<p>Hi</p>".into(),
            text_body: "Hi".into(),
            from: "noreply@example.com".into(),
            to: vec!["a@b.com".into()],
        };
        assert!(email.is_addressed_to("a@b.com"));
        assert!(!email.is_addressed_to("c@d.com"));
    }
}
