//! The generative adapter boundary.
//!
//! Turns a normalized question into a candidate SQL statement plus metadata.
//! Nothing produced here is trusted: the candidate goes straight to the guard.

pub mod mock;
pub mod openrouter;
pub mod parser;
pub mod prompt;
pub mod types;

pub use mock::MockLlmClient;
pub use openrouter::{OpenRouterClient, OpenRouterConfig};
pub use parser::parse_generation;
pub use prompt::build_messages;
pub use types::{Message, Role, SqlGeneration};

use async_trait::async_trait;

use crate::error::Result;

/// Trait for LLM clients that can generate completions.
///
/// Implementations must be thread-safe (Send + Sync) to support async use.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion for the given messages.
    async fn complete(&self, messages: &[Message]) -> Result<String>;
}

/// Runs one generation round trip: prompt build, completion, payload parse.
pub async fn generate_sql(client: &dyn LlmClient, question: &str) -> Result<SqlGeneration> {
    let messages = build_messages(question);
    let content = client.complete(&messages).await?;
    parse_generation(&content)
}
