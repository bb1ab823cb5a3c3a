//! Sandboxed query execution.
//!
//! Runs one guarded statement against one freshly loaded snapshot inside an
//! ephemeral in-memory SQLite instance. The engine exists only for the
//! duration of one call: created, populated, queried, and closed on every exit
//! path, so nothing is shared across requests and nothing leaks between them.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, Row, TypeInfo, ValueRef};
use tracing::debug;

use crate::dataset::{normalize_score, DatasetRow};
use crate::error::{Result, TradeQueryError};

/// Default timeout for executing the guarded statement.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// A single scalar from the engine, one variant per SQLite storage class.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary data.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts the value to its JSON representation.
    ///
    /// Non-finite floats have no JSON number form and become null; binary
    /// data becomes a size placeholder.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::from(s.clone()),
            Value::Bytes(b) => serde_json::Value::from(format!("<{} bytes>", b.len())),
        }
    }
}

/// Result of executing a guarded statement: column names in engine order and
/// fully materialized rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Renders each row as an ordered column-name-to-JSON mapping.
    pub fn rows_as_mappings(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().map(Value::to_json))
                    .collect()
            })
            .collect()
    }
}

/// Executes guarded statements in per-call ephemeral engine instances.
#[derive(Debug, Clone)]
pub struct Sandbox {
    query_timeout: Duration,
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Sandbox {
    /// Creates a sandbox with the default query timeout.
    pub fn new() -> Self {
        Self {
            query_timeout: Duration::from_secs(QUERY_TIMEOUT_SECS),
        }
    }

    /// Sets the query timeout.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Loads the snapshot into a fresh engine, runs the statement, and tears
    /// the engine down whether or not execution succeeded.
    pub async fn execute(
        &self,
        table: &str,
        snapshot: &[DatasetRow],
        sql: &str,
    ) -> Result<ResultSet> {
        let pool = open_engine().await?;
        let result = self.run(&pool, table, snapshot, sql).await;
        pool.close().await;
        result
    }

    async fn run(
        &self,
        pool: &SqlitePool,
        table: &str,
        snapshot: &[DatasetRow],
        sql: &str,
    ) -> Result<ResultSet> {
        let create = format!(
            "CREATE TABLE \"{table}\" (id INTEGER, country TEXT, region TEXT, lpi_score REAL, year INTEGER)"
        );
        sqlx::query(&create)
            .execute(pool)
            .await
            .map_err(|e| TradeQueryError::execution(e.to_string()))?;

        let insert = format!(
            "INSERT INTO \"{table}\" (id, country, region, lpi_score, year) VALUES (?, ?, ?, ?, ?)"
        );
        for row in snapshot {
            sqlx::query(&insert)
                .bind(row.id)
                .bind(&row.country)
                .bind(&row.region)
                .bind(normalize_score(row.lpi_score.as_ref()))
                .bind(row.year)
                .execute(pool)
                .await
                .map_err(|e| TradeQueryError::execution(e.to_string()))?;
        }
        debug!("Loaded {} rows into sandbox table {table}", snapshot.len());

        let fetched = tokio::time::timeout(self.query_timeout, sqlx::query(sql).fetch_all(pool))
            .await
            .map_err(|_| {
                TradeQueryError::execution(format!(
                    "query timed out after {} seconds",
                    self.query_timeout.as_secs()
                ))
            })?
            .map_err(|e| TradeQueryError::execution(e.to_string()))?;

        // Column names come from the first row; an empty result falls back to
        // the prepared statement's metadata.
        let columns: Vec<String> = if let Some(first) = fetched.first() {
            first
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect()
        } else {
            pool.describe(sql)
                .await
                .map(|described| {
                    described
                        .columns()
                        .iter()
                        .map(|col| col.name().to_string())
                        .collect()
                })
                .unwrap_or_default()
        };

        let rows: Vec<Vec<Value>> = fetched.iter().map(convert_row).collect();

        Ok(ResultSet { columns, rows })
    }
}

async fn open_engine() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| TradeQueryError::execution(e.to_string()))?;

    // One connection: an in-memory database lives and dies with it.
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| TradeQueryError::execution(format!("Failed to open sandbox engine: {e}")))
}

/// Converts a sqlx SqliteRow to our row type.
fn convert_row(row: &SqliteRow) -> Vec<Value> {
    (0..row.len()).map(|i| convert_value(row, i)).collect()
}

/// Converts a single column value, dispatching on the value's runtime storage
/// class rather than the declared column type so computed columns decode
/// correctly.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let Ok(raw) = row.try_get_raw(index) else {
        return Value::Null;
    };
    if raw.is_null() {
        return Value::Null;
    }

    match raw.type_info().name() {
        "INTEGER" | "BOOLEAN" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        // TEXT and anything exotic degrade to text.
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::Text)
            .unwrap_or(Value::Null),
    }
}
