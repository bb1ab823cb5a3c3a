//! Question sanitization ahead of the generative adapter.
//!
//! Collapses whitespace, strips configured prompt-injection phrases, and
//! bounds the length. Total and infallible; an empty result is the caller's
//! signal to reject the request instead of attempting generation.

use regex::Regex;
use tracing::warn;

/// Maximum question length after normalization, in characters.
pub const MAX_QUESTION_LEN: usize = 500;

/// Normalizes a free-text question before it is handed to the adapter.
///
/// Returns the empty string when nothing meaningful remains.
pub fn normalize_question(question: &str, injection_phrases: &[String]) -> String {
    let mut cleaned = collapse_whitespace(question);

    for phrase in injection_phrases {
        let pattern = format!("(?i){}", regex::escape(phrase));
        match Regex::new(&pattern) {
            Ok(re) => cleaned = re.replace_all(&cleaned, "").into_owned(),
            Err(e) => warn!("Skipping unusable injection phrase {phrase:?}: {e}"),
        }
    }

    // Phrase removal can leave doubled spaces behind.
    let cleaned = collapse_whitespace(&cleaned);

    cleaned.chars().take(MAX_QUESTION_LEN).collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
