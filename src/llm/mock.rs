//! Mock LLM client for testing.
//!
//! Returns canned JSON payloads based on input patterns, so the pipeline can
//! be exercised without API calls.

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::types::Message;
use crate::llm::LlmClient;

/// Mock LLM client that returns canned responses based on input patterns.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response), checked first.
    custom_responses: Vec<(String, String)>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the question contains `pattern` (case-insensitive), the mock
    /// returns `response` verbatim.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Generates a mock payload for the question text.
    fn mock_response(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        if input_lower.contains("asia") {
            return r#"{"sql": "SELECT country, region, lpi_score, year FROM countries_lpi WHERE LOWER(region) = 'asia' AND lpi_score > 3.0 ORDER BY lpi_score DESC", "confidence": 0.9, "notes": "", "assumptions": ["region match is case-insensitive"]}"#
                .to_string();
        }

        if input_lower.contains("average") || input_lower.contains("by region") {
            return r#"{"sql": "SELECT region, AVG(lpi_score) AS avg_lpi_score FROM countries_lpi GROUP BY region ORDER BY avg_lpi_score DESC", "confidence": 0.85, "notes": "", "assumptions": []}"#
                .to_string();
        }

        if input_lower.contains("top") {
            return r#"{"sql": "SELECT country, region, lpi_score, year FROM countries_lpi WHERE year = (SELECT MAX(year) FROM countries_lpi) ORDER BY lpi_score DESC LIMIT 5", "confidence": 0.8, "notes": "", "assumptions": ["latest year"]}"#
                .to_string();
        }

        r#"{"sql": "SELECT id, country, region, lpi_score, year FROM countries_lpi ORDER BY id", "confidence": 0.5, "notes": "", "assumptions": []}"#
            .to_string()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        // Respond to the question, not the system preamble.
        let question = messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(self.mock_response(question))
    }
}
