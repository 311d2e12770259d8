//! Configuration types.
//!
//! Credentials come in two named bundles, mirroring the secret-store layout
//! of the triggering platform: one for the LLM endpoint, one for the mail
//! API. Both are read once at startup and passed explicitly into component
//! constructors — there is no process-global state.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default model for extraction. Chosen for low-variance structured output;
/// overridable via `AR_ASSIST_MODEL`.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// LLM credential bundle.
#[derive(Debug, Clone)]
pub struct LlmSecrets {
    pub api_key: SecretString,
    pub model: String,
}

impl LlmSecrets {
    /// Build from environment variables.
    ///
    /// Requires `OPENAI_API_KEY`; `AR_ASSIST_MODEL` is optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = require_env("OPENAI_API_KEY")?;
        let model =
            std::env::var("AR_ASSIST_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Ok(Self {
            api_key: SecretString::from(api_key),
            model,
        })
    }
}

/// Mail-API credential bundle.
#[derive(Debug, Clone)]
pub struct MailerSecrets {
    pub api_key: SecretString,
    pub from_address: String,
}

impl MailerSecrets {
    /// Build from environment variables.
    ///
    /// Requires `SENDGRID_API_KEY` and `SENDGRID_FROM_EMAIL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = require_env("SENDGRID_API_KEY")?;
        let from_address = require_env("SENDGRID_FROM_EMAIL")?;
        if !from_address.contains('@') {
            return Err(ConfigError::InvalidValue {
                key: "SENDGRID_FROM_EMAIL".into(),
                message: format!("'{from_address}' is not an email address"),
            });
        }
        Ok(Self {
            api_key: SecretString::from(api_key),
            from_address,
        })
    }
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingEnvVar(key.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_env_rejects_missing() {
        // SAFETY: test-only env mutation; no other thread reads this var.
        unsafe { std::env::remove_var("AR_ASSIST_TEST_MISSING") };
        assert!(require_env("AR_ASSIST_TEST_MISSING").is_err());
    }

    #[test]
    fn require_env_rejects_blank() {
        // SAFETY: test-only env mutation; no other thread reads this var.
        unsafe { std::env::set_var("AR_ASSIST_TEST_BLANK", "  ") };
        assert!(require_env("AR_ASSIST_TEST_BLANK").is_err());
    }

    #[test]
    fn require_env_accepts_value() {
        // SAFETY: test-only env mutation; no other thread reads this var.
        unsafe { std::env::set_var("AR_ASSIST_TEST_SET", "value") };
        assert_eq!(require_env("AR_ASSIST_TEST_SET").unwrap(), "value");
    }
}
