//! Per-request pipeline orchestration.
//!
//! One question is one self-contained unit of work: normalize, generate,
//! guard, snapshot, execute. Generation comes first because the guard needs
//! its output; the snapshot is fetched fresh for every request.

use serde::Serialize;
use tracing::{debug, info};

use crate::dataset::DatasetSource;
use crate::error::{Result, TradeQueryError};
use crate::guard::{GuardPolicy, QueryGuard};
use crate::llm::{self, LlmClient};
use crate::question::normalize_question;
use crate::sandbox::Sandbox;

/// The caller-facing answer to one question.
#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswer {
    /// The guarded statement that actually ran.
    pub sql: String,
    /// Result column names in engine order.
    pub columns: Vec<String>,
    /// Result rows as ordered column-to-value mappings.
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    /// Metadata about the generation and execution.
    pub meta: QueryMeta,
}

/// Metadata accompanying a [`QueryAnswer`].
#[derive(Debug, Clone, Serialize)]
pub struct QueryMeta {
    pub row_count: usize,
    pub confidence: f64,
    pub notes: String,
    pub assumptions: Vec<String>,
    pub default_limit_applied: bool,
}

/// Orchestrates the pipeline over its two external collaborators.
///
/// Holds no mutable state; concurrent requests never share an engine
/// instance or a snapshot.
pub struct QueryService<'a> {
    llm: &'a dyn LlmClient,
    dataset: &'a dyn DatasetSource,
    guard: QueryGuard,
    sandbox: Sandbox,
}

impl<'a> QueryService<'a> {
    /// Creates a service over the given collaborators and guard policy.
    pub fn new(
        llm: &'a dyn LlmClient,
        dataset: &'a dyn DatasetSource,
        policy: GuardPolicy,
    ) -> Self {
        Self {
            llm,
            dataset,
            guard: QueryGuard::new(policy),
            sandbox: Sandbox::new(),
        }
    }

    /// Answers one natural-language question.
    pub async fn answer(&self, question: &str) -> Result<QueryAnswer> {
        let normalized = normalize_question(question, &self.guard.policy().injection_phrases);
        if normalized.is_empty() {
            return Err(TradeQueryError::EmptyQuestion);
        }
        debug!("Normalized question: {normalized}");

        let generation = llm::generate_sql(self.llm, &normalized).await?;
        debug!("Candidate statement: {}", generation.sql);

        let guarded = self.guard.guard(&generation.sql)?;

        let snapshot = self.dataset.fetch_snapshot().await?;
        info!(
            rows = snapshot.len(),
            limited = guarded.default_limit_applied,
            "Executing guarded statement against fresh snapshot"
        );

        let results = self
            .sandbox
            .execute(&self.guard.policy().table, &snapshot, &guarded.sql)
            .await?;

        Ok(QueryAnswer {
            meta: QueryMeta {
                row_count: results.row_count(),
                confidence: generation.confidence,
                notes: generation.notes,
                assumptions: generation.assumptions,
                default_limit_applied: guarded.default_limit_applied,
            },
            rows: results.rows_as_mappings(),
            columns: results.columns,
            sql: guarded.sql,
        })
    }
}
