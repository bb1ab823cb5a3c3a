//! Error types for tradequery.
//!
//! Defines the main error enum used throughout the pipeline. Every variant is
//! a recoverable, user-visible condition; none should crash the process.

use thiserror::Error;

use crate::guard::GuardRejection;

/// Main error type for tradequery operations.
#[derive(Error, Debug)]
pub enum TradeQueryError {
    /// The question was empty after normalization.
    #[error("Question is empty after normalization")]
    EmptyQuestion,

    /// Generation errors (adapter failure or unparseable model output).
    #[error("Generation error: {0}")]
    Generation(String),

    /// The candidate query was rejected by the guard.
    #[error("Query rejected: {0}")]
    Rejected(#[from] GuardRejection),

    /// Dataset fetch errors (non-success response, malformed page).
    #[error("Data source error: {0}")]
    DataSource(String),

    /// Sandbox execution errors on a guard-accepted statement.
    #[error("SQL execution error: {0}")]
    Execution(String),

    /// Configuration errors (invalid config file, missing required values).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TradeQueryError {
    /// Creates a generation error with the given message.
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Creates a data source error with the given message.
    pub fn data_source(msg: impl Into<String>) -> Self {
        Self::DataSource(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::EmptyQuestion => "Empty Question",
            Self::Generation(_) => "Generation Error",
            Self::Rejected(_) => "Guard Rejection",
            Self::DataSource(_) => "Data Source Error",
            Self::Execution(_) => "Execution Error",
            Self::Config(_) => "Configuration Error",
        }
    }
}

/// Result type alias using TradeQueryError.
pub type Result<T> = std::result::Result<T, TradeQueryError>;
