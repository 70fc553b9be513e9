//! Interactive terminal front-end.
//!
//! Two states: `Idle` shows the prompt-to-begin banner, `Running` executes
//! one analysis pass. Both market segments run concurrently and are joined
//! before rendering; a run cannot be cancelled mid-flight.

use std::io::{self, BufRead, Write};

use crate::advisor::{self, Advisory, AdvisorError, AdvisoryResponse};
use crate::billing;
use crate::config::AdvisorConfig;
use crate::quotes::{self, MarketSegment, TW_MARKET, US_MARKET};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Idle,
    Running,
}

pub struct App {
    config: AdvisorConfig,
    state: AppState,
}

impl App {
    pub fn new(config: AdvisorConfig) -> Self {
        Self {
            config,
            state: AppState::Idle,
        }
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    /// Print the banner and quota line, then loop on the trigger prompt
    /// until EOF or `q`.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        println!("📊 本週 GPT 股票潛力分析");
        println!("分析台股與美股，找出最有機會在一個月內翻倍的潛力股（使用 GPT 分析）");

        // Quota probe runs once at startup, independent of the trigger.
        match billing::fetch_quota(&self.config).await {
            Ok(status) => println!("{}", billing::format_quota(&status)),
            Err(e) => println!("{}", format_quota_error(&e)),
        }

        let stdin = io::stdin();
        loop {
            println!();
            print!("按 Enter 開始本週分析（q 離開）> ");
            io::stdout().flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break; // EOF
            }
            let cmd = line.trim();
            if cmd.eq_ignore_ascii_case("q") {
                break;
            }
            if !cmd.is_empty() && !cmd.eq_ignore_ascii_case("r") {
                continue;
            }

            self.run_analysis().await;
        }

        Ok(())
    }

    /// One full analysis pass over both segments.
    async fn run_analysis(&mut self) {
        self.state = AppState::Running;
        log::info!("Starting analysis run");
        println!("正在抓取股票資料與生成分析...");

        let (us, tw) = tokio::join!(
            run_segment(&self.config, &US_MARKET),
            run_segment(&self.config, &TW_MARKET),
        );

        print!("{}", format_segment(&US_MARKET, &us));
        print!("{}", format_segment(&TW_MARKET, &tw));

        println!("\n更新時間：{}", chrono::Local::now().date_naive());
        self.state = AppState::Idle;
    }
}

/// Fetch -> compose -> advise for one market segment.
async fn run_segment(
    config: &AdvisorConfig,
    segment: &MarketSegment,
) -> Result<AdvisoryResponse, AdvisorError> {
    let watchlist = quotes::fetch_watchlist(segment.tickers).await;
    let prompt = advisor::build_advisory_prompt(&watchlist, segment);
    advisor::request_advisory(config, &prompt).await
}

/// Render one segment's result block. Advisory errors render as a single
/// warning line; structured picks render as a numbered list.
pub fn format_segment(
    segment: &MarketSegment,
    result: &Result<AdvisoryResponse, AdvisorError>,
) -> String {
    let mut out = format!("\n{}\n", segment.heading);

    match result {
        Ok(resp) => match &resp.advisory {
            Advisory::Structured(picks) => {
                for (i, pick) in picks.iter().enumerate() {
                    out.push_str(&format!("{}. {}：{}\n", i + 1, pick.symbol, pick.reasoning));
                }
            }
            Advisory::Unstructured(text) => {
                out.push_str("（未結構化回應，以原文顯示）\n");
                out.push_str(text);
                out.push('\n');
            }
        },
        Err(e) => {
            out.push_str(&format_advisory_error(e));
            out.push('\n');
        }
    }

    out
}

pub fn format_advisory_error(err: &AdvisorError) -> String {
    format!("⚠️ 模型呼叫錯誤：{}", err)
}

pub fn format_quota_error(err: &AdvisorError) -> String {
    if billing::is_transient(err) {
        format!("⚠️ 無法查詢 API 額度：{}（稍後會自動恢復）", err)
    } else {
        format!("⚠️ 無法查詢 API 額度：{}", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::StockPick;

    fn ok_response(advisory: Advisory) -> Result<AdvisoryResponse, AdvisorError> {
        Ok(AdvisoryResponse {
            advisory,
            provider: "OpenAI".to_string(),
            model: "gpt-4o-mini".to_string(),
            tokens_used: Some(321),
        })
    }

    #[test]
    fn test_format_segment_structured_picks_numbered() {
        let result = ok_response(Advisory::Structured(vec![
            StockPick {
                symbol: "NVDA".to_string(),
                reasoning: "AI 需求強勁".to_string(),
            },
            StockPick {
                symbol: "TSLA".to_string(),
                reasoning: "交車量回升".to_string(),
            },
        ]));
        let block = format_segment(&US_MARKET, &result);
        assert!(block.contains(US_MARKET.heading));
        assert!(block.contains("1. NVDA"));
        assert!(block.contains("2. TSLA"));
    }

    #[test]
    fn test_format_segment_unstructured_is_flagged() {
        let result = ok_response(Advisory::Unstructured("自由文字回應".to_string()));
        let block = format_segment(&TW_MARKET, &result);
        assert!(block.contains("未結構化回應"));
        assert!(block.contains("自由文字回應"));
    }

    #[test]
    fn test_format_segment_error_renders_warning_line() {
        let result = Err(AdvisorError::network_error("OpenAI", "gpt-4o-mini", "連線失敗"));
        let block = format_segment(&US_MARKET, &result);
        assert!(block.contains("⚠️"));
        assert!(block.contains("錯誤"));
    }

    #[test]
    fn test_advisory_error_string_has_warning_marker() {
        let err = AdvisorError::network_error("OpenAI", "gpt-4o-mini", "connection refused");
        let s = format_advisory_error(&err);
        assert!(s.starts_with("⚠️"));
        assert!(s.contains("錯誤"));
    }

    #[test]
    fn test_quota_error_string_has_warning_marker() {
        let err = AdvisorError::invalid_api_key("OpenAI", "gpt-4o-mini");
        let s = format_quota_error(&err);
        assert!(s.starts_with("⚠️"));
        assert!(s.contains("額度"));
    }

    #[test]
    fn test_app_starts_idle() {
        let config = AdvisorConfig {
            api_key: "sk-test".to_string(),
            model: "gpt-4o-mini".to_string(),
            provider: crate::config::AdvisoryProvider::OpenAi,
            chat_api_url: "http://localhost/v1/chat/completions".to_string(),
            billing_api_url: "http://localhost/billing".to_string(),
        };
        let app = App::new(config);
        assert_eq!(app.state(), AppState::Idle);
    }
}
