use crate::service::categorizer::Categorizer;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static CURRENCY_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:₹|Rs\.?|INR)\s?(\d{2,8})").expect("valid currency regex")
});

const SKIPPED_MARKERS: &[&str] = &["Total", "Bill No", "Date"];

/// One categorised line of a receipt.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BillItem {
    pub item: String,
    pub category: String,
    pub score: u32,
    pub explanation: String,
    pub amount: f64,
}

/// Split OCR text into line items. Header/footer lines and lines without
/// digits are skipped.
pub fn itemize(ocr_text: &str, categorizer: &Categorizer) -> Vec<BillItem> {
    ocr_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !SKIPPED_MARKERS.iter().any(|m| line.contains(m)))
        .filter(|line| line.chars().any(|c| c.is_ascii_digit()))
        .filter_map(|line| {
            let top = categorizer.suggest(line, 1).into_iter().next()?;
            Some(BillItem {
                item: line.to_string(),
                category: top.category,
                score: top.score,
                explanation: top.explanation,
                amount: currency_amount(line).unwrap_or(0.0),
            })
        })
        .collect()
}

/// Last currency-prefixed number on the line.
pub fn currency_amount(line: &str) -> Option<f64> {
    CURRENCY_AMOUNT
        .captures_iter(line)
        .last()
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
