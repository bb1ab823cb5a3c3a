//! Command-line interface for tradequery.

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

/// Ask a question in natural language; get guarded SQL answers over the
/// countries LPI dataset.
#[derive(Parser, Debug)]
#[command(name = "tradequery", version, about)]
pub struct Cli {
    /// The question to answer (joined with spaces when given as several words).
    #[arg(required = true)]
    pub question: Vec<String>,

    /// Path to the configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Model identifier override (also via OPENROUTER_MODEL).
    #[arg(long)]
    pub model: Option<String>,

    /// Pretty-print the JSON answer.
    #[arg(long)]
    pub pretty: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path, falling back to the platform default.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Returns the question as a single string.
    pub fn question(&self) -> String {
        self.question.join(" ")
    }
}
