//! Advisory module type definitions
//!
//! Request constants, the tagged error type shared by the advisory and
//! billing clients, and the structured advisory result.

use serde::{Deserialize, Serialize};

// ============================================================================
// Request Configuration Constants
// ============================================================================

/// Request timeout in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Maximum retries for transient errors
pub const MAX_RETRIES: u32 = 2;

/// Base delay for exponential backoff (milliseconds)
pub const RETRY_BASE_DELAY_MS: u64 = 1000;

/// Maximum tokens for the advisory response
pub const MAX_TOKENS: u32 = 1024;

/// Sampling temperature for advisory requests
pub const TEMPERATURE: f32 = 0.7;

// ============================================================================
// Structured Advisory Errors
// ============================================================================

/// Types of remote API errors
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorErrorKind {
    /// Rate limit exceeded - too many requests, retry after delay
    RateLimit,
    /// Quota/credits exhausted - top up or switch plan
    QuotaExceeded,
    /// Invalid or expired API key
    InvalidApiKey,
    /// Model not found or not available
    ModelNotFound,
    /// Server error on provider side
    ServerError,
    /// Network/connection error
    NetworkError,
    /// Other/unknown error
    Other,
}

/// Structured API error with details.
///
/// Callers can branch on `kind` ("retry later" vs. "fix the key"); only the
/// presentation layer flattens this into a display string.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorError {
    pub kind: AdvisorErrorKind,
    pub message: String,
    pub provider: String,
    pub model: String,
    /// Suggested retry delay in seconds (for rate limit errors)
    pub retry_after_secs: Option<u32>,
}

impl AdvisorError {
    pub fn rate_limit(provider: &str, model: &str, retry_after: Option<u32>) -> Self {
        Self {
            kind: AdvisorErrorKind::RateLimit,
            message: "請求過於頻繁，請稍候再試。".to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
            retry_after_secs: retry_after,
        }
    }

    pub fn quota_exceeded(provider: &str, model: &str) -> Self {
        Self {
            kind: AdvisorErrorKind::QuotaExceeded,
            message: "API 額度已用盡，請檢查帳戶方案。".to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
            retry_after_secs: None,
        }
    }

    pub fn invalid_api_key(provider: &str, model: &str) -> Self {
        Self {
            kind: AdvisorErrorKind::InvalidApiKey,
            message: "API 金鑰無效，請檢查設定。".to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
            retry_after_secs: None,
        }
    }

    pub fn model_not_found(provider: &str, model: &str) -> Self {
        Self {
            kind: AdvisorErrorKind::ModelNotFound,
            message: format!("模型 '{}' 不可用。", model),
            provider: provider.to_string(),
            model: model.to_string(),
            retry_after_secs: None,
        }
    }

    pub fn server_error(provider: &str, model: &str, details: &str) -> Self {
        Self {
            kind: AdvisorErrorKind::ServerError,
            message: format!("{} 伺服器錯誤：{}", provider, details),
            provider: provider.to_string(),
            model: model.to_string(),
            retry_after_secs: Some(5),
        }
    }

    pub fn network_error(provider: &str, model: &str, details: &str) -> Self {
        Self {
            kind: AdvisorErrorKind::NetworkError,
            message: format!("網路錯誤：{}", details),
            provider: provider.to_string(),
            model: model.to_string(),
            retry_after_secs: Some(3),
        }
    }

    pub fn other(provider: &str, model: &str, message: &str) -> Self {
        Self {
            kind: AdvisorErrorKind::Other,
            message: message.to_string(),
            provider: provider.to_string(),
            model: model.to_string(),
            retry_after_secs: None,
        }
    }
}

impl std::fmt::Display for AdvisorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AdvisorError {}

// ============================================================================
// Advisory Result Types
// ============================================================================

/// One recommended stock with the model's reasoning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockPick {
    pub symbol: String,
    pub reasoning: String,
}

/// Parsed advisory content.
///
/// `Unstructured` is the explicit fallback when the model did not honor the
/// requested JSON format; the raw text is still displayable.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Advisory {
    Structured(Vec<StockPick>),
    Unstructured(String),
}

/// Advisory result with provider metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryResponse {
    pub advisory: Advisory,
    pub provider: String,
    pub model: String,
    pub tokens_used: Option<u32>,
}
