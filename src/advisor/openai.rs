//! OpenAI chat-completion provider for advisory requests

use super::parsing::{calculate_backoff_delay, parse_advisory, parse_retry_delay, truncate_body};
use super::types::{
    AdvisorError, AdvisorErrorKind, AdvisoryResponse, MAX_RETRIES, MAX_TOKENS,
    REQUEST_TIMEOUT_SECS, TEMPERATURE,
};
use crate::config::AdvisorConfig;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    max_completion_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

/// Parse OpenAI API error response
fn parse_error(status: u16, body: &str, model: &str) -> AdvisorError {
    let body_lower = body.to_lowercase();

    match status {
        429 => {
            // OpenAI uses 429 for both rate limit and exhausted quota
            if body_lower.contains("quota") || body_lower.contains("billing") {
                AdvisorError::quota_exceeded("OpenAI", model)
            } else {
                let retry_after = parse_retry_delay(body);
                AdvisorError::rate_limit("OpenAI", model, retry_after)
            }
        }
        401 | 403 => AdvisorError::invalid_api_key("OpenAI", model),
        404 => AdvisorError::model_not_found("OpenAI", model),
        500..=599 => AdvisorError::server_error("OpenAI", model, &format!("HTTP {}", status)),
        _ => AdvisorError::other(
            "OpenAI",
            model,
            &format!("HTTP {}: {}", status, truncate_body(body, 200)),
        ),
    }
}

/// Check if error is retryable
fn is_retryable(err: &AdvisorError) -> bool {
    matches!(
        err.kind,
        AdvisorErrorKind::RateLimit | AdvisorErrorKind::ServerError | AdvisorErrorKind::NetworkError
    )
}

/// Send one advisory prompt as the sole user turn and parse the first
/// choice's content, with retry on transient errors.
pub async fn advise(config: &AdvisorConfig, prompt: &str) -> Result<AdvisoryResponse, AdvisorError> {
    let model = config.model.as_str();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| AdvisorError::invalid_api_key("OpenAI", model))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .pool_max_idle_per_host(2)
        .build()
        .map_err(|e| AdvisorError::network_error("OpenAI", model, &e.to_string()))?;

    let request_body = ChatCompletionRequest {
        model: model.to_string(),
        max_completion_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }],
    };

    let mut last_error = AdvisorError::other("OpenAI", model, "No attempts made");

    for attempt in 0..=MAX_RETRIES {
        if attempt > 0 {
            log::info!("Retrying advisory request (attempt {})", attempt + 1);
            tokio::time::sleep(calculate_backoff_delay(attempt - 1)).await;
        }

        let response = match client.post(&config.chat_api_url).json(&request_body).send().await {
            Ok(resp) => resp,
            Err(e) => {
                last_error = if e.is_timeout() {
                    AdvisorError::network_error("OpenAI", model, "連線逾時")
                } else if e.is_connect() {
                    AdvisorError::network_error("OpenAI", model, "連線失敗")
                } else {
                    AdvisorError::network_error("OpenAI", model, &e.to_string())
                };

                if attempt < MAX_RETRIES && is_retryable(&last_error) {
                    continue;
                }
                return Err(last_error);
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            last_error = parse_error(status.as_u16(), &body, model);

            if attempt < MAX_RETRIES && is_retryable(&last_error) {
                continue;
            }
            return Err(last_error);
        }

        // Success - parse response
        let data: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AdvisorError::other("OpenAI", model, &format!("JSON parse error: {}", e)))?;

        let raw_text = data
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        return Ok(AdvisoryResponse {
            advisory: parse_advisory(&raw_text),
            provider: "OpenAI".to_string(),
            model: model.to_string(),
            tokens_used: data.usage.map(|u| u.total_tokens),
        });
    }

    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_401_is_invalid_key() {
        let err = parse_error(401, "Unauthorized", "gpt-4o-mini");
        assert_eq!(err.kind, AdvisorErrorKind::InvalidApiKey);
    }

    #[test]
    fn test_parse_error_404_is_model_not_found() {
        let err = parse_error(404, "model does not exist", "gpt-4o-mini");
        assert_eq!(err.kind, AdvisorErrorKind::ModelNotFound);
        assert!(err.message.contains("gpt-4o-mini"));
    }

    #[test]
    fn test_parse_error_429_quota_vs_rate_limit() {
        let quota = parse_error(429, "You exceeded your current quota", "gpt-4o-mini");
        assert_eq!(quota.kind, AdvisorErrorKind::QuotaExceeded);

        let rate = parse_error(429, "Rate limit reached. Please try again in 4s.", "gpt-4o-mini");
        assert_eq!(rate.kind, AdvisorErrorKind::RateLimit);
        assert_eq!(rate.retry_after_secs, Some(4));
    }

    #[test]
    fn test_parse_error_long_multibyte_body_does_not_panic() {
        let body = "伺服器回應錯誤".repeat(50);
        let err = parse_error(400, &body, "gpt-4o-mini");
        assert_eq!(err.kind, AdvisorErrorKind::Other);
        assert!(err.message.starts_with("HTTP 400"));
    }

    #[test]
    fn test_parse_error_5xx_is_server_error() {
        let err = parse_error(503, "service unavailable", "gpt-4o-mini");
        assert_eq!(err.kind, AdvisorErrorKind::ServerError);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(is_retryable(&AdvisorError::rate_limit("OpenAI", "m", None)));
        assert!(is_retryable(&AdvisorError::server_error("OpenAI", "m", "HTTP 500")));
        assert!(is_retryable(&AdvisorError::network_error("OpenAI", "m", "refused")));
        assert!(!is_retryable(&AdvisorError::invalid_api_key("OpenAI", "m")));
        assert!(!is_retryable(&AdvisorError::quota_exceeded("OpenAI", "m")));
    }
}
