//! Dataset source abstraction.
//!
//! The production store is only ever read through this boundary: a complete,
//! ordered snapshot of the single permitted table is materialized before any
//! query runs. Untrusted SQL never reaches the system of record; it runs
//! against the snapshot inside the sandbox.

mod mock;
mod rest;
pub mod score;

pub use mock::MockDatasetSource;
pub use rest::RestDatasetSource;
pub use score::normalize_score;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A numeric-like score as delivered by the upstream API: a number, or text
/// that may spell the number out. Coerced to `f64` at sandbox load time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ScoreValue {
    /// Already numeric.
    Number(f64),
    /// Textual, e.g. "3.5" or "three point five".
    Text(String),
}

/// One row of the permitted table, as fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetRow {
    pub id: i64,
    pub country: String,
    pub region: String,
    #[serde(default)]
    pub lpi_score: Option<ScoreValue>,
    pub year: i64,
}

/// Trait for collaborators that can materialize the dataset snapshot.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Fetches the complete table contents, ordered by `id` ascending.
    ///
    /// Returns every row or fails as a whole; there is no partial snapshot.
    async fn fetch_snapshot(&self) -> Result<Vec<DatasetRow>>;
}
