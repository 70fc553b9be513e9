//! Billing quota probe.
//!
//! Two authenticated GETs against the billing endpoint: the subscription
//! hard limit and the usage accumulated from the first of the current month
//! through today. Usage is reported in hundredths of a USD. Nothing is
//! cached; every startup recomputes the status.

use crate::advisor::parsing::truncate_body;
use crate::advisor::types::{AdvisorError, AdvisorErrorKind};
use crate::config::AdvisorConfig;
use chrono::{Datelike, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Billing-cycle consumption against the subscription limit, valid only for
/// the instant it was computed.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuotaStatus {
    pub used_usd: f64,
    pub limit_usd: f64,
    pub remaining_usd: f64,
}

impl QuotaStatus {
    /// `total_usage` arrives in hundredths of a USD; the limit is already USD.
    pub fn from_parts(total_usage_hundredths: f64, hard_limit_usd: f64) -> Self {
        let used_usd = total_usage_hundredths / 100.0;
        Self {
            used_usd,
            limit_usd: hard_limit_usd,
            remaining_usd: hard_limit_usd - used_usd,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubscriptionResponse {
    hard_limit_usd: f64,
}

#[derive(Debug, Deserialize)]
struct UsageResponse {
    total_usage: f64,
}

/// Usage window: first of the current month through today.
pub fn usage_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today.with_day(1).unwrap_or(today), today)
}

/// Fixed-precision display line for the quota status.
pub fn format_quota(status: &QuotaStatus) -> String {
    format!(
        "🧾 OpenAI 使用額度：${:.2} / ${:.2}（剩餘 ${:.2}）",
        status.used_usd, status.limit_usd, status.remaining_usd
    )
}

fn create_client(api_key: &str, model: &str) -> Result<reqwest::Client, AdvisorError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| AdvisorError::invalid_api_key("OpenAI", model))?,
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| AdvisorError::network_error("OpenAI", model, &e.to_string()))
}

/// Map a billing error response to the shared tagged error type.
fn parse_error(status: u16, body: &str, model: &str) -> AdvisorError {
    let body_lower = body.to_lowercase();
    match status {
        401 | 403 => AdvisorError::invalid_api_key("OpenAI", model),
        429 if body_lower.contains("quota") => AdvisorError::quota_exceeded("OpenAI", model),
        429 => AdvisorError::rate_limit("OpenAI", model, None),
        500..=599 => AdvisorError::server_error("OpenAI", model, &format!("HTTP {}", status)),
        _ => AdvisorError::other(
            "OpenAI",
            model,
            &format!("HTTP {}: {}", status, truncate_body(body, 200)),
        ),
    }
}

async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    model: &str,
) -> Result<T, AdvisorError> {
    log::debug!("Fetching billing data from {}", url);

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            AdvisorError::network_error("OpenAI", model, "連線逾時")
        } else {
            AdvisorError::network_error("OpenAI", model, &e.to_string())
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        log::error!("Billing API error: {} - {}", status, body);
        return Err(parse_error(status.as_u16(), &body, model));
    }

    response
        .json()
        .await
        .map_err(|e| AdvisorError::other("OpenAI", model, &format!("JSON parse error: {}", e)))
}

/// Fetch the subscription limit and month-to-date usage, and compute the
/// remaining budget. Never panics; all failures surface as [`AdvisorError`].
pub async fn fetch_quota(config: &AdvisorConfig) -> Result<QuotaStatus, AdvisorError> {
    let model = config.model.as_str();
    let client = create_client(&config.api_key, model)?;

    let subscription: SubscriptionResponse = get_json(
        &client,
        &format!("{}/subscription", config.billing_api_url),
        model,
    )
    .await?;

    let (start, end) = usage_window(Utc::now().date_naive());
    let usage: UsageResponse = get_json(
        &client,
        &format!(
            "{}/usage?start_date={}&end_date={}",
            config.billing_api_url, start, end
        ),
        model,
    )
    .await?;

    let status = QuotaStatus::from_parts(usage.total_usage, subscription.hard_limit_usd);
    log::info!(
        "Quota: used ${:.2} of ${:.2}",
        status.used_usd,
        status.limit_usd
    );
    Ok(status)
}

/// True when the failure is worth retrying later rather than fixing settings.
pub fn is_transient(err: &AdvisorError) -> bool {
    matches!(
        err.kind,
        AdvisorErrorKind::RateLimit | AdvisorErrorKind::ServerError | AdvisorErrorKind::NetworkError
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_is_limit_minus_used() {
        // usage=5000 hundredths with limit=20 -> 20 - 50.00 = -30.00
        let status = QuotaStatus::from_parts(5000.0, 20.0);
        assert_eq!(status.used_usd, 50.0);
        assert_eq!(status.limit_usd, 20.0);
        assert_eq!(status.remaining_usd, -30.0);
    }

    #[test]
    fn test_format_quota_two_decimals() {
        let status = QuotaStatus::from_parts(5000.0, 20.0);
        let line = format_quota(&status);
        assert!(line.contains("$50.00"));
        assert!(line.contains("$20.00"));
        assert!(line.contains("$-30.00"));
    }

    #[test]
    fn test_usage_window_starts_first_of_month() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
        let (start, end) = usage_window(today);
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert_eq!(end, today);
    }

    #[test]
    fn test_usage_window_on_first_of_month() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let (start, end) = usage_window(today);
        assert_eq!(start, end);
    }

    #[test]
    fn test_subscription_response_shape() {
        let raw = r#"{"object":"billing_subscription","hard_limit_usd":20.0,"has_payment_method":true}"#;
        let sub: SubscriptionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(sub.hard_limit_usd, 20.0);
    }

    #[test]
    fn test_usage_response_shape() {
        let raw = r#"{"object":"list","total_usage":5000.0}"#;
        let usage: UsageResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(usage.total_usage, 5000.0);
    }

    #[test]
    fn test_billing_error_mapping() {
        assert_eq!(parse_error(401, "", "m").kind, AdvisorErrorKind::InvalidApiKey);
        assert_eq!(
            parse_error(429, "insufficient_quota", "m").kind,
            AdvisorErrorKind::QuotaExceeded
        );
        assert_eq!(parse_error(502, "", "m").kind, AdvisorErrorKind::ServerError);
    }

    #[test]
    fn test_billing_error_long_multibyte_body_does_not_panic() {
        let body = "額度查詢失敗".repeat(60);
        let err = parse_error(400, &body, "m");
        assert_eq!(err.kind, AdvisorErrorKind::Other);
    }
}
