//! Advisory response parsing and retry utilities.

use serde::Deserialize;

use crate::advisor::types::{Advisory, StockPick, RETRY_BASE_DELAY_MS};

/// Wrapper shape some models produce instead of a bare array.
#[derive(Deserialize)]
struct PickList {
    picks: Vec<StockPick>,
}

/// Parse the model's reply into a structured advisory.
///
/// Handles common model quirks (markdown code fences, a `{"picks": [...]}`
/// wrapper). The model is not contractually obligated to return valid JSON,
/// so any parse failure falls back to `Unstructured` with the raw text —
/// never an error.
pub fn parse_advisory(raw: &str) -> Advisory {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Ok(picks) = serde_json::from_str::<Vec<StockPick>>(cleaned) {
        if !picks.is_empty() {
            return Advisory::Structured(picks);
        }
    }

    if let Ok(list) = serde_json::from_str::<PickList>(cleaned) {
        if !list.picks.is_empty() {
            return Advisory::Structured(list.picks);
        }
    }

    Advisory::Unstructured(raw.trim().to_string())
}

/// Parse retry delay from error response (supports "4s", "4.5s", seconds as number)
pub fn parse_retry_delay(text: &str) -> Option<u32> {
    // "retryDelay": "Xs" pattern
    if let Some(idx) = text.find("retryDelay") {
        let after = &text[idx..];
        for word in after.split_whitespace().take(5) {
            if let Some(secs) = parse_seconds_token(word) {
                return Some(secs);
            }
        }
    }
    // "try again in X" / "retry in X" pattern
    for marker in ["try again in", "retry in"] {
        if let Some(idx) = text.find(marker) {
            let after = &text[idx + marker.len()..];
            for word in after.split_whitespace().take(3) {
                if let Some(secs) = parse_seconds_token(word) {
                    return Some(secs);
                }
            }
        }
    }
    None
}

/// Extract a (possibly decimal) seconds value from one token like `"4s"`,
/// `4.5s` or `20s.` — trailing sentence punctuation must not defeat the
/// parse. Interior decimal points are preserved.
fn parse_seconds_token(word: &str) -> Option<u32> {
    let clean = word.trim_matches(|c: char| !c.is_numeric());
    clean.parse::<f64>().ok().map(|secs| secs.ceil() as u32)
}

/// Truncate a response body for error messages without splitting a
/// multi-byte UTF-8 character.
pub fn truncate_body(body: &str, max_bytes: usize) -> &str {
    if body.len() <= max_bytes {
        return body;
    }
    let mut end = max_bytes;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Calculate exponential backoff delay
pub fn calculate_backoff_delay(attempt: u32) -> std::time::Duration {
    let delay_ms = RETRY_BASE_DELAY_MS * 2u64.pow(attempt);
    std::time::Duration::from_millis(delay_ms.min(10_000)) // Max 10 seconds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_advisory_bare_json_array() {
        let raw = r#"[{"symbol":"NVDA","reasoning":"AI 需求強勁"},{"symbol":"TSLA","reasoning":"交車量回升"}]"#;
        match parse_advisory(raw) {
            Advisory::Structured(picks) => {
                assert_eq!(picks.len(), 2);
                assert_eq!(picks[0].symbol, "NVDA");
            }
            other => panic!("Expected structured advisory, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_advisory_strips_code_fences() {
        let raw = "```json\n[{\"symbol\":\"PLTR\",\"reasoning\":\"動能強\"}]\n```";
        match parse_advisory(raw) {
            Advisory::Structured(picks) => assert_eq!(picks[0].symbol, "PLTR"),
            other => panic!("Expected structured advisory, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_advisory_accepts_picks_wrapper() {
        let raw = r#"{"picks":[{"symbol":"0056.TW","reasoning":"高股息"}]}"#;
        match parse_advisory(raw) {
            Advisory::Structured(picks) => assert_eq!(picks[0].symbol, "0056.TW"),
            other => panic!("Expected structured advisory, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_advisory_falls_back_to_unstructured() {
        let raw = "我建議關注 NVDA、TSLA 與 PLTR，原因如下…";
        match parse_advisory(raw) {
            Advisory::Unstructured(text) => assert_eq!(text, raw),
            other => panic!("Expected unstructured fallback, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_advisory_empty_array_is_unstructured() {
        match parse_advisory("[]") {
            Advisory::Unstructured(_) => {}
            other => panic!("Expected unstructured fallback, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_retry_delay_retry_delay_format() {
        let text = r#"{"error": {"retryDelay": "4s"}}"#;
        assert_eq!(parse_retry_delay(text), Some(4));
    }

    #[test]
    fn test_parse_retry_delay_try_again_format() {
        let text = "Rate limit reached. Please try again in 1.2s.";
        assert_eq!(parse_retry_delay(text), Some(2)); // Ceiled
    }

    #[test]
    fn test_parse_retry_delay_trailing_period() {
        let text = "Rate limit reached. Please try again in 4s.";
        assert_eq!(parse_retry_delay(text), Some(4));
    }

    #[test]
    fn test_parse_retry_delay_none() {
        assert_eq!(parse_retry_delay("Some error without delay info"), None);
    }

    #[test]
    fn test_truncate_body_short_input_unchanged() {
        assert_eq!(truncate_body("short", 200), "short");
    }

    #[test]
    fn test_truncate_body_ascii() {
        let body = "x".repeat(300);
        assert_eq!(truncate_body(&body, 200).len(), 200);
    }

    #[test]
    fn test_truncate_body_keeps_char_boundary() {
        // 100 three-byte characters; byte 200 falls inside one of them
        let body = "錯".repeat(100);
        let truncated = truncate_body(&body, 200);
        assert_eq!(truncated.len(), 198);
        assert_eq!(truncated.chars().count(), 66);
    }

    #[test]
    fn test_calculate_backoff_delay() {
        assert_eq!(calculate_backoff_delay(0), std::time::Duration::from_millis(1000));
        assert_eq!(calculate_backoff_delay(1), std::time::Duration::from_millis(2000));
        assert_eq!(calculate_backoff_delay(10), std::time::Duration::from_millis(10000)); // Capped
    }
}
