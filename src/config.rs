//! Configuration management for tradequery.
//!
//! Handles loading configuration from a TOML file and environment variables.
//! The guard's policy values (row cap, permitted table, keyword and phrase
//! sets) are configuration data so they can be audited and overridden without
//! touching code. There is no settings singleton: the `Config` is constructed
//! once at startup and passed down.

use crate::error::{Result, TradeQueryError};
use crate::guard::GuardPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure for tradequery.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Generative adapter configuration.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Dataset source configuration.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Guard policy (row cap, permitted table, keyword/phrase sets).
    #[serde(default)]
    pub guard: GuardPolicy,
}

/// Generative adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier passed to the OpenRouter API.
    #[serde(default = "default_model")]
    pub model: String,

    /// API key. Usually supplied via `OPENROUTER_API_KEY` rather than the file.
    #[serde(default)]
    pub api_key: String,
}

fn default_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: String::new(),
        }
    }
}

/// Dataset source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Base URL of the REST interface over the permitted table.
    #[serde(default)]
    pub base_url: String,

    /// API key. Usually supplied via `DATASET_API_KEY` rather than the file.
    #[serde(default)]
    pub api_key: String,

    /// Rows fetched per page while materializing the snapshot.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    1000
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            page_size: default_page_size(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tradequery")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the defaults; a malformed file is an error.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| TradeQueryError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            TradeQueryError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies environment variable overrides on top of the file values.
    ///
    /// `OPENROUTER_API_KEY`, `OPENROUTER_MODEL`, `DATASET_URL` and
    /// `DATASET_API_KEY` take precedence over the config file when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
            if !key.is_empty() {
                self.llm.api_key = key;
            }
        }
        if let Ok(model) = std::env::var("OPENROUTER_MODEL") {
            if !model.is_empty() {
                self.llm.model = model;
            }
        }
        if let Ok(url) = std::env::var("DATASET_URL") {
            if !url.is_empty() {
                self.dataset.base_url = url;
            }
        }
        if let Ok(key) = std::env::var("DATASET_API_KEY") {
            if !key.is_empty() {
                self.dataset.api_key = key;
            }
        }
    }

    /// Validates that the configuration is usable for a live run.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.is_empty() {
            return Err(TradeQueryError::config(
                "OPENROUTER_API_KEY is missing (set it in the environment or [llm] api_key)",
            ));
        }
        if self.dataset.base_url.is_empty() {
            return Err(TradeQueryError::config(
                "DATASET_URL is missing (set it in the environment or [dataset] base_url)",
            ));
        }
        Url::parse(&self.dataset.base_url)
            .map_err(|e| TradeQueryError::config(format!("Invalid dataset URL: {e}")))?;
        if self.dataset.api_key.is_empty() {
            return Err(TradeQueryError::config(
                "DATASET_API_KEY is missing (set it in the environment or [dataset] api_key)",
            ));
        }
        Ok(())
    }
}
