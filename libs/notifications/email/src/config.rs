//! Email pipeline settings

use core_config::{env_or_default, ConfigError, FromEnv};
use std::env;
use std::path::PathBuf;

/// Sender address and template location
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailSettings {
    /// From address on every outgoing email
    pub from_address: String,
    /// Directory of `*.html` templates loaded over the built-in ones
    pub template_dir: Option<PathBuf>,
}

impl EmailSettings {
    pub fn new(from_address: impl Into<String>) -> Self {
        Self {
            from_address: from_address.into(),
            template_dir: None,
        }
    }
}

impl FromEnv for EmailSettings {
    /// - EMAIL_FROM_ADDRESS, then DEFAULT_FROM_EMAIL, then noreply@localhost
    /// - EMAIL_TEMPLATE_DIR: optional
    fn from_env() -> Result<Self, ConfigError> {
        let from_address = env::var("EMAIL_FROM_ADDRESS")
            .or_else(|_| env::var("DEFAULT_FROM_EMAIL"))
            .unwrap_or_else(|_| "noreply@localhost".to_string());

        let template_dir = Some(env_or_default("EMAIL_TEMPLATE_DIR", ""))
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            from_address,
            template_dir,
        })
    }
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self::new("noreply@localhost")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        temp_env::with_vars_unset(
            ["EMAIL_FROM_ADDRESS", "DEFAULT_FROM_EMAIL", "EMAIL_TEMPLATE_DIR"],
            || {
                let settings = EmailSettings::from_env().unwrap();
                assert_eq!(settings, EmailSettings::default());
            },
        );
    }

    #[test]
    fn test_default_from_email_fallback() {
        temp_env::with_vars(
            [
                ("EMAIL_FROM_ADDRESS", None),
                ("DEFAULT_FROM_EMAIL", Some("hello@youtubers.example")),
            ],
            || {
                let settings = EmailSettings::from_env().unwrap();
                assert_eq!(settings.from_address, "hello@youtubers.example");
            },
        );
    }

    #[test]
    fn test_explicit_values_win() {
        temp_env::with_vars(
            [
                ("EMAIL_FROM_ADDRESS", Some("team@youtubers.example")),
                ("DEFAULT_FROM_EMAIL", Some("hello@youtubers.example")),
                ("EMAIL_TEMPLATE_DIR", Some("/srv/templates/emails")),
            ],
            || {
                let settings = EmailSettings::from_env().unwrap();
                assert_eq!(settings.from_address, "team@youtubers.example");
                assert_eq!(
                    settings.template_dir,
                    Some(PathBuf::from("/srv/templates/emails"))
                );
            },
        );
    }
}
