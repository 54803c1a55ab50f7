use regex::Regex;
use std::sync::LazyLock;

static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2,6}\b").expect("valid amount regex"));

/// Spoken words mapped to a category, checked in order; the last hit wins.
const SPOKEN_CATEGORIES: &[&str] = &[
    "food",
    "transport",
    "bill",
    "shopping",
    "entertainment",
    "medical",
    "other",
    "lunch",
    "dinner",
    "breakfast",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedVoiceExpense {
    pub category: String,
    pub amount: f64,
}

/// Pull an amount and a coarse category out of a transcribed voice note.
pub fn parse_transcript(transcript: &str) -> ParsedVoiceExpense {
    let amount = extract_amount(transcript).unwrap_or(0.0);
    let lower = transcript.to_lowercase();
    let category = SPOKEN_CATEGORIES
        .iter()
        .rev()
        .find(|word| lower.contains(*word))
        .map(|word| title_case(word))
        .unwrap_or_else(|| "Other".to_string());
    ParsedVoiceExpense { category, amount }
}

/// First standalone 2-6 digit number.
pub fn extract_amount(text: &str) -> Option<f64> {
    AMOUNT.find(text).and_then(|m| m.as_str().parse().ok())
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
