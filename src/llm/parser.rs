//! Payload parsing for model output.
//!
//! The model is asked for a JSON object but cannot be trusted to produce one
//! cleanly: content may arrive wrapped in a markdown code fence, confidence
//! may be a word or a numeric string, assumptions may be a bare string.
//! Everything coercible is coerced; only unparseable JSON is an error.

use serde_json::Value;

use crate::error::{Result, TradeQueryError};
use crate::llm::types::SqlGeneration;

/// Maximum number of assumptions carried through to the caller.
const MAX_ASSUMPTIONS: usize = 6;

/// Parses raw model content into a [`SqlGeneration`].
pub fn parse_generation(content: &str) -> Result<SqlGeneration> {
    let body = strip_code_fence(content);

    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| TradeQueryError::generation(format!("Unable to parse model output: {e}")))?;

    let sql = parsed
        .get("sql")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    let notes = parsed
        .get("notes")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    let confidence = normalize_confidence(parsed.get("confidence").unwrap_or(&Value::Null));
    let assumptions = normalize_assumptions(parsed.get("assumptions").unwrap_or(&Value::Null));

    Ok(SqlGeneration {
        sql,
        confidence,
        notes,
        assumptions,
    })
}

/// Coerces a loosely-typed confidence value into [0, 1].
///
/// Numbers are clamped; "high"/"medium"/"low" map to 0.9/0.6/0.3; numeric
/// strings are parsed and clamped; anything else degrades to 0.0.
fn normalize_confidence(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f.clamp(0.0, 1.0)).unwrap_or(0.0),
        Value::String(s) => {
            let lowered = s.trim().to_lowercase();
            match lowered.as_str() {
                "high" => 0.9,
                "medium" => 0.6,
                "low" => 0.3,
                _ => lowered
                    .parse::<f64>()
                    .map(|f| f.clamp(0.0, 1.0))
                    .unwrap_or(0.0),
            }
        }
        _ => 0.0,
    }
}

/// Coerces assumptions into at most [`MAX_ASSUMPTIONS`] non-empty strings.
fn normalize_assumptions(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            })
            .filter(|s| !s.is_empty())
            .take(MAX_ASSUMPTIONS)
            .collect(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed.to_string()]
            }
        }
        _ => Vec::new(),
    }
}

/// Strips one surrounding markdown code fence (```json ... ``` or ``` ... ```)
/// when present, returning the inner content.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(newline) = rest.find('\n') else {
        return trimmed;
    };
    let inner = &rest[newline + 1..];
    match inner.rfind("```") {
        Some(end) => inner[..end].trim(),
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_clean_payload() {
        let generation = parse_generation(
            r#"{"sql": "SELECT country FROM countries_lpi LIMIT 5", "confidence": 0.85, "notes": "latest year assumed", "assumptions": ["latest year"]}"#,
        )
        .unwrap();

        assert_eq!(generation.sql, "SELECT country FROM countries_lpi LIMIT 5");
        assert_eq!(generation.confidence, 0.85);
        assert_eq!(generation.notes, "latest year assumed");
        assert_eq!(generation.assumptions, vec!["latest year".to_string()]);
    }

    #[test]
    fn test_parse_fenced_payload() {
        let content = "```json\n{\"sql\": \"SELECT 1\", \"confidence\": 1}\n```";
        let generation = parse_generation(content).unwrap();
        assert_eq!(generation.sql, "SELECT 1");
        assert_eq!(generation.confidence, 1.0);
    }

    #[test]
    fn test_parse_bare_fence() {
        let content = "```\n{\"sql\": \"SELECT 1\"}\n```";
        let generation = parse_generation(content).unwrap();
        assert_eq!(generation.sql, "SELECT 1");
    }

    #[test]
    fn test_unparseable_content_is_generation_error() {
        let result = parse_generation("here is your query: SELECT 1");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unable to parse model output"));
    }

    #[test]
    fn test_missing_keys_degrade_to_defaults() {
        let generation = parse_generation("{}").unwrap();
        assert_eq!(generation.sql, "");
        assert_eq!(generation.confidence, 0.0);
        assert_eq!(generation.notes, "");
        assert!(generation.assumptions.is_empty());
    }

    #[test]
    fn test_confidence_words() {
        assert_eq!(normalize_confidence(&Value::String("high".into())), 0.9);
        assert_eq!(normalize_confidence(&Value::String("Medium".into())), 0.6);
        assert_eq!(normalize_confidence(&Value::String(" low ".into())), 0.3);
    }

    #[test]
    fn test_confidence_numeric_string_clamped() {
        assert_eq!(normalize_confidence(&Value::String("0.75".into())), 0.75);
        assert_eq!(normalize_confidence(&Value::String("7".into())), 1.0);
        assert_eq!(normalize_confidence(&Value::String("-1".into())), 0.0);
    }

    #[test]
    fn test_confidence_number_clamped() {
        assert_eq!(normalize_confidence(&serde_json::json!(1.7)), 1.0);
        assert_eq!(normalize_confidence(&serde_json::json!(-0.2)), 0.0);
        assert_eq!(normalize_confidence(&serde_json::json!(0.4)), 0.4);
    }

    #[test]
    fn test_confidence_garbage_degrades_to_zero() {
        assert_eq!(normalize_confidence(&Value::String("certain".into())), 0.0);
        assert_eq!(normalize_confidence(&Value::Bool(true)), 0.0);
        assert_eq!(normalize_confidence(&Value::Null), 0.0);
    }

    #[test]
    fn test_assumptions_capped_and_cleaned() {
        let value = serde_json::json!(["a", " b ", "", "c", "d", "e", "f", "g"]);
        let assumptions = normalize_assumptions(&value);
        assert_eq!(assumptions, vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_assumptions_from_bare_string() {
        assert_eq!(
            normalize_assumptions(&Value::String(" latest year ".into())),
            vec!["latest year".to_string()]
        );
        assert!(normalize_assumptions(&Value::String("  ".into())).is_empty());
        assert!(normalize_assumptions(&Value::Null).is_empty());
    }
}
