//! Numeric coercion for the score column.
//!
//! Upstream data mixes numbers, numeric strings, and spelled-out phrases like
//! "three point five". Everything coercible becomes an `f64`; everything else
//! becomes `None`. One malformed value must never abort a whole snapshot load.

use super::ScoreValue;

const WORD_NUMBERS: [(&str, &str); 10] = [
    ("zero", "0"),
    ("one", "1"),
    ("two", "2"),
    ("three", "3"),
    ("four", "4"),
    ("five", "5"),
    ("six", "6"),
    ("seven", "7"),
    ("eight", "8"),
    ("nine", "9"),
];

/// Coerces a score value into a float, or `None` when it cannot be parsed.
pub fn normalize_score(value: Option<&ScoreValue>) -> Option<f64> {
    match value {
        None => None,
        Some(ScoreValue::Number(n)) => Some(*n),
        Some(ScoreValue::Text(raw)) => parse_textual_score(raw),
    }
}

fn parse_textual_score(raw: &str) -> Option<f64> {
    let lowered = raw.trim().to_lowercase();
    if let Ok(parsed) = lowered.parse::<f64>() {
        return Some(parsed);
    }

    // "three point five" -> "3.5"
    let rebuilt: String = lowered
        .split_whitespace()
        .map(|part| {
            if part == "point" {
                "."
            } else {
                WORD_NUMBERS
                    .iter()
                    .find(|(word, _)| *word == part)
                    .map(|(_, digit)| *digit)
                    .unwrap_or(part)
            }
        })
        .collect();

    rebuilt.parse::<f64>().ok()
}
