//! Yahoo Finance Quote Provider
//!
//! One GET per symbol against the v7 quote endpoint; consumes
//! `regularMarketPrice`, `shortName`, and `trailingPE`. A field missing from
//! the response becomes the unavailable sentinel, not an error.

use super::Quote;
use anyhow::{anyhow, Result};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;

const BASE_URL: &str = "https://query1.finance.yahoo.com/v7/finance/quote";

/// Request timeout in seconds. Yahoo occasionally hangs on exotic symbols.
const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Deserialize)]
struct QuoteEnvelope {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteResponse,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    result: Vec<QuoteRow>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRow {
    symbol: String,
    short_name: Option<String>,
    long_name: Option<String>,
    regular_market_price: Option<f64>,
    // camelCase would give "trailingPe"; the API spells it "trailingPE"
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<f64>,
}

/// Create an HTTP client with a browser User-Agent (Yahoo rejects the default)
fn create_client() -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"),
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))
}

/// Fetch the latest snapshot for one symbol
pub async fn fetch_quote(symbol: &str) -> Result<Quote> {
    let url = format!("{}?symbols={}", BASE_URL, urlencoding::encode(symbol));
    log::debug!("Fetching Yahoo quote for {} from {}", symbol, url);

    let client = create_client()?;
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| anyhow!("Request failed for {}: {}", symbol, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        log::error!("Yahoo API error for {}: {} - {}", symbol, status, body);
        return Err(anyhow!("HTTP error for {}: {} - {}", symbol, status, body));
    }

    let data: QuoteEnvelope = response
        .json()
        .await
        .map_err(|e| anyhow!("Failed to parse JSON for {}: {}", symbol, e))?;

    if let Some(error) = data.quote_response.error {
        log::error!("Yahoo API returned error for {}: {}", symbol, error);
        return Err(anyhow!("Yahoo API error for {}: {}", symbol, error));
    }

    let row = data
        .quote_response
        .result
        .into_iter()
        .find(|r| r.symbol.eq_ignore_ascii_case(symbol))
        .ok_or_else(|| anyhow!("No quote data available for {}", symbol))?;

    Ok(quote_from_row(row))
}

/// Build a Quote from one response row; missing fields become the sentinel.
fn quote_from_row(row: QuoteRow) -> Quote {
    Quote {
        symbol: row.symbol,
        name: row.short_name.or(row.long_name),
        last_price: row.regular_market_price,
        pe_ratio: row.trailing_pe,
    }
}
