//! Advisory prompt building
//!
//! Pure string templating: identical inputs produce byte-identical prompts.

use crate::quotes::{MarketSegment, Quote};

/// Build the advisory prompt for one market segment.
///
/// Header names the segment, one bullet per quote in input order, footer asks
/// for three one-month 100%-upside candidates with reasoning in the segment's
/// locale, returned as a JSON pick list (so the response can be parsed
/// instead of paired to input rows by line position).
pub fn build_advisory_prompt(quotes: &[Quote], segment: &MarketSegment) -> String {
    let mut text = format!(
        "以下是{}股票清單與資訊（價格單位：{}）：\n",
        segment.label, segment.currency_unit
    );

    for q in quotes {
        text.push_str(&format!(
            "- {} {}（價格：{}，本益比：{}）\n",
            q.symbol,
            q.name.as_deref().unwrap_or("N/A"),
            fmt_field(q.last_price),
            fmt_field(q.pe_ratio),
        ));
    }

    text.push_str(&format!(
        "請從中選出三檔最有機會在一個月內上漲 100% 的股票，並用{}簡潔說明原因。\n",
        segment.locale
    ));
    text.push_str(
        "只回覆 JSON 陣列，格式：[{\"symbol\": \"...\", \"reasoning\": \"...\"}]，\
         不要加任何其他文字或 Markdown 標記。",
    );

    text
}

/// Numeric field or the `N/A` sentinel.
fn fmt_field(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}", v),
        None => "N/A".to_string(),
    }
}
