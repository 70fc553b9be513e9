//! Watchlist quote fetching.
//!
//! One provider is currently wired up (Yahoo Finance); the per-symbol fetch
//! is guarded so a single failing ticker degrades to an all-sentinel quote
//! instead of aborting the whole batch.

pub mod yahoo;

use serde::Serialize;

/// Snapshot for one watchlist symbol.
///
/// `None` is the "unavailable" sentinel: the upstream source did not return
/// that field. Rendered as `N/A`, never an error.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub name: Option<String>,
    pub last_price: Option<f64>,
    pub pe_ratio: Option<f64>,
}

impl Quote {
    /// All-sentinel quote for a symbol whose fetch failed entirely.
    pub fn unavailable(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: None,
            last_price: None,
            pe_ratio: None,
        }
    }
}

/// A named group of tickers analyzed together, with the locale the model
/// should answer in and the currency unit shown next to prices.
#[derive(Debug, Clone, Copy)]
pub struct MarketSegment {
    pub label: &'static str,
    pub heading: &'static str,
    pub locale: &'static str,
    pub currency_unit: &'static str,
    pub tickers: &'static [&'static str],
}

pub const US_MARKET: MarketSegment = MarketSegment {
    label: "美股",
    heading: "🇺🇸 GPT 分析：美股推薦",
    locale: "繁體中文",
    currency_unit: "USD",
    tickers: &["NVDA", "TSLA", "PLTR"],
};

pub const TW_MARKET: MarketSegment = MarketSegment {
    label: "台股",
    heading: "🇹🇼 GPT 分析：台股推薦",
    locale: "繁體中文",
    currency_unit: "TWD",
    tickers: &["0056.TW", "2409.TW", "3035.TW"],
};

/// Fetch the latest snapshot for every symbol, in input order.
///
/// Returns exactly one [`Quote`] per symbol. A fetch failure for one symbol
/// is logged and replaced by [`Quote::unavailable`]; it never aborts the
/// batch or disturbs the 1:1 ordering.
pub async fn fetch_watchlist(symbols: &[&str]) -> Vec<Quote> {
    fetch_watchlist_with(symbols, |s| async move { yahoo::fetch_quote(&s).await }).await
}

/// Batch loop generic over the per-symbol fetch, so the
/// ordering/cardinality/degradation contract is testable without a network.
async fn fetch_watchlist_with<F, Fut>(symbols: &[&str], fetch: F) -> Vec<Quote>
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<Quote>>,
{
    let mut quotes = Vec::with_capacity(symbols.len());

    for symbol in symbols {
        let quote = match fetch(symbol.to_string()).await {
            Ok(q) => q,
            Err(e) => {
                log::warn!("Quote fetch failed for {}: {}", symbol, e);
                Quote::unavailable(symbol)
            }
        };
        quotes.push(quote);
    }

    quotes
}
