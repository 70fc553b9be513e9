//! Runtime configuration.
//!
//! The credential and endpoint settings are read once at startup into an
//! immutable [`AdvisorConfig`] that is passed by reference to every component.

use thiserror::Error;

/// Default chat-completion model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default chat-completion endpoint.
pub const DEFAULT_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default billing endpoint base (subscription and usage live below it).
pub const DEFAULT_BILLING_URL: &str = "https://api.openai.com/dashboard/billing";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    #[error("unknown advisory provider '{0}'")]
    UnknownProvider(String),
}

/// Provider backing the advisory and billing calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvisoryProvider {
    OpenAi,
}

impl AdvisoryProvider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OPENAI" => Some(Self::OpenAi),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI",
        }
    }
}

/// Immutable runtime configuration, constructed once in `main`.
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub api_key: String,
    pub model: String,
    pub provider: AdvisoryProvider,
    pub chat_api_url: String,
    pub billing_api_url: String,
}

impl AdvisorConfig {
    /// Build the configuration from environment variables.
    ///
    /// `OPENAI_API_KEY` is required; model, provider, and both endpoint URLs
    /// can be overridden so a different vendor deployment can be pointed at
    /// without a code change.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let provider = match std::env::var("ADVISOR_PROVIDER") {
            Ok(raw) => {
                AdvisoryProvider::from_str(&raw).ok_or(ConfigError::UnknownProvider(raw))?
            }
            Err(_) => AdvisoryProvider::OpenAi,
        };

        Ok(Self {
            api_key,
            model: std::env::var("ADVISOR_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            provider,
            chat_api_url: std::env::var("ADVISOR_CHAT_URL")
                .unwrap_or_else(|_| DEFAULT_CHAT_URL.to_string()),
            billing_api_url: std::env::var("ADVISOR_BILLING_URL")
                .unwrap_or_else(|_| DEFAULT_BILLING_URL.to_string()),
        })
    }
}
