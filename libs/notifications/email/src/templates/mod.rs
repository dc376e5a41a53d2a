//! Email template rendering with Handlebars
//!
//! This module provides:
//! - `TemplateRenderer` trait, the seam the processor renders through
//! - `TemplateEngine`: Handlebars-backed renderer with built-in confirmation templates
//! - `strip_tags` for deriving the plain-text body from rendered HTML

use crate::envelope::{CONTACT_TEMPLATE, Context, YOUTUBER_INQUIRY_TEMPLATE};
use crate::error::{NotificationError, NotificationResult};
use handlebars::Handlebars;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Renders a named template with a context into HTML
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, context: &Context) -> NotificationResult<String>;
}

/// Handlebars-based template engine
///
/// Templates are registered under their file name (e.g.
/// `contact_confirmation.html`). Values are HTML-escaped; unknown
/// variables render as empty strings.
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    /// Create a new TemplateEngine with the built-in templates
    pub fn new() -> NotificationResult<Self> {
        let mut engine = Self::empty();
        engine.register(CONTACT_TEMPLATE, CONTACT_CONFIRMATION_HTML)?;
        engine.register(YOUTUBER_INQUIRY_TEMPLATE, YOUTUBER_CONTACT_CONFIRMATION_HTML)?;
        Ok(engine)
    }

    /// Create an engine with no templates registered
    pub fn empty() -> Self {
        Self {
            handlebars: Handlebars::new(),
        }
    }

    /// Built-in templates, then every `*.html` file in `dir` (overriding
    /// built-ins of the same name)
    pub fn from_directory(dir: impl AsRef<Path>) -> NotificationResult<Self> {
        let dir = dir.as_ref();
        let mut engine = Self::new()?;

        let entries = fs::read_dir(dir).map_err(|e| {
            NotificationError::Template(format!("cannot read template dir {}: {e}", dir.display()))
        })?;

        let mut loaded = 0usize;
        for entry in entries {
            let path = entry
                .map_err(|e| NotificationError::Template(e.to_string()))?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("html") {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let source = fs::read_to_string(&path).map_err(|e| {
                NotificationError::Template(format!("cannot read {}: {e}", path.display()))
            })?;
            engine.register(name, &source)?;
            loaded += 1;
        }

        info!(dir = %dir.display(), loaded, "Loaded email templates");
        Ok(engine)
    }

    /// Register a template
    pub fn register(&mut self, name: &str, source: &str) -> NotificationResult<()> {
        self.handlebars
            .register_template_string(name, source)
            .map_err(|e| NotificationError::Template(format!("failed to register {name}: {e}")))?;
        debug!(template = %name, "Registered template");
        Ok(())
    }

    /// Check if a template exists
    pub fn has_template(&self, name: &str) -> bool {
        self.handlebars.has_template(name)
    }
}

impl TemplateRenderer for TemplateEngine {
    fn render(&self, template: &str, context: &Context) -> NotificationResult<String> {
        if !self.has_template(template) {
            return Err(NotificationError::Template(format!(
                "template not found: {template}"
            )));
        }
        self.handlebars
            .render(template, context)
            .map_err(|e| NotificationError::Template(format!("failed to render {template}: {e}")))
    }
}

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag pattern"));
static BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid blank line pattern"));

/// Plain-text version of an HTML body: tags removed, lines trimmed,
/// runs of blank lines collapsed
pub fn strip_tags(html: &str) -> String {
    let text = TAG.replace_all(html, "");
    let trimmed = text
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    BLANK_LINES.replace_all(&trimmed, "\n\n").trim().to_string()
}

const CONTACT_CONFIRMATION_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Thank you for contacting us</title></head>
<body style="font-family: Arial, sans-serif; color: #333;">
  <h2>Hi {{first_name}} {{last_name}},</h2>
  <p>Thank you for reaching out to YouTubers Modern. We received your message and will get back to you soon.</p>
  <h3>Your submission</h3>
  <table>
    <tr><td><strong>Subject:</strong></td><td>{{subject}}</td></tr>
    <tr><td><strong>Email:</strong></td><td>{{email}}</td></tr>
    <tr><td><strong>Phone:</strong></td><td>{{phone}}</td></tr>
    <tr><td><strong>Location:</strong></td><td>{{city}} {{state}}</td></tr>
    <tr><td><strong>Submitted:</strong></td><td>{{created_date}}</td></tr>
  </table>
  <p><strong>Message:</strong></p>
  <p>{{message}}</p>
  <p>Best regards,<br>The YouTubers Modern Team</p>
</body>
</html>
"#;

const YOUTUBER_CONTACT_CONFIRMATION_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Your inquiry</title></head>
<body style="font-family: Arial, sans-serif; color: #333;">
  <h2>Hi {{first_name}} {{last_name}},</h2>
  <p>Thank you for your inquiry about <strong>{{youtuber_name}}</strong> ({{youtuber_category}}).</p>
  <p>Our team will review your request and reply shortly.</p>
  <table>
    <tr><td><strong>Email:</strong></td><td>{{email}}</td></tr>
    <tr><td><strong>Phone:</strong></td><td>{{phone}}</td></tr>
    <tr><td><strong>Submitted:</strong></td><td>{{created_date}}</td></tr>
  </table>
  <p><strong>Message:</strong></p>
  <p>{{message}}</p>
  <p>Best regards,<br>The YouTubers Modern Team</p>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(value: serde_json::Value) -> Context {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_template_engine_creation() {
        let engine = TemplateEngine::new().unwrap();
        assert!(engine.has_template("contact_confirmation.html"));
        assert!(engine.has_template("youtuber_contact_confirmation.html"));
        assert!(!engine.has_template("welcome.html"));
    }

    #[test]
    fn test_contact_rendering() {
        let engine = TemplateEngine::new().unwrap();
        let html = engine
            .render(
                "contact_confirmation.html",
                &context(json!({
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "message": "<script>alert(1)</script>"
                })),
            )
            .unwrap();

        assert!(html.contains("Hi Ada Lovelace"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_missing_template() {
        let engine = TemplateEngine::new().unwrap();
        let err = engine.render("nope.html", &Context::new()).unwrap_err();
        assert!(matches!(err, NotificationError::Template(_)));
    }

    #[test]
    fn test_custom_template() {
        let mut engine = TemplateEngine::empty();
        engine
            .register("promo.html", "<p>Hello {{name}}</p>")
            .unwrap();

        let html = engine
            .render("promo.html", &context(json!({ "name": "World" })))
            .unwrap();
        assert_eq!(html, "<p>Hello World</p>");
    }

    #[test]
    fn test_invalid_template_source() {
        let mut engine = TemplateEngine::empty();
        assert!(engine.register("broken.html", "{{#if}}").is_err());
    }

    #[test]
    fn test_from_directory() {
        let dir = std::env::temp_dir().join(format!("email-templates-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("promo.html"), "<b>{{code}}</b>").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let engine = TemplateEngine::from_directory(&dir).unwrap();
        assert!(engine.has_template("promo.html"));
        assert!(engine.has_template("contact_confirmation.html"));
        assert!(!engine.has_template("notes.txt"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_strip_tags() {
        let text = strip_tags("<h1>Hi</h1>\n\n\n\n<p>Line <b>bold</b></p>\n");
        assert_eq!(text, "Hi\n\nLine bold");
    }
}
