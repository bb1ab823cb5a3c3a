//! REST dataset source.
//!
//! Speaks the PostgREST conventions the upstream exposes: `Range` headers for
//! pagination, `select`/`order` query parameters, `apikey` plus bearer auth.
//! Pages are fetched until a short page signals the end; any non-success
//! response or malformed page aborts the whole fetch.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::config::DatasetConfig;
use crate::error::{Result, TradeQueryError};

use super::{DatasetRow, DatasetSource};

/// Default timeout for dataset requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Columns requested from the upstream table.
const SELECT_COLUMNS: &str = "id,country,region,lpi_score,year";

/// Paginated REST client over the single permitted table.
#[derive(Debug, Clone)]
pub struct RestDatasetSource {
    client: Client,
    endpoint: String,
    api_key: String,
    page_size: usize,
}

impl RestDatasetSource {
    /// Creates a source for the table under the configured base URL.
    pub fn new(config: &DatasetConfig, table: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                TradeQueryError::data_source(format!("Failed to create HTTP client: {e}"))
            })?;

        let endpoint = format!("{}/{}", config.base_url.trim_end_matches('/'), table);

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            page_size: config.page_size.max(1),
        })
    }

    /// Returns the endpoint this source reads from.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DatasetSource for RestDatasetSource {
    async fn fetch_snapshot(&self) -> Result<Vec<DatasetRow>> {
        let mut all_rows: Vec<DatasetRow> = Vec::new();
        let mut start = 0usize;

        loop {
            let end = start + self.page_size - 1;
            debug!("Fetching dataset rows {start}-{end}");

            let response = self
                .client
                .get(&self.endpoint)
                .header("apikey", &self.api_key)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Accept", "application/json")
                .header("Range", format!("{start}-{end}"))
                .query(&[("select", SELECT_COLUMNS), ("order", "id.asc")])
                .send()
                .await
                .map_err(|e| TradeQueryError::data_source(format!("Request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(TradeQueryError::data_source(format!(
                    "REST error: {status} {body}"
                )));
            }

            let batch: Vec<DatasetRow> = response.json().await.map_err(|e| {
                TradeQueryError::data_source(format!("Malformed dataset page: {e}"))
            })?;

            let batch_len = batch.len();
            all_rows.extend(batch);

            if batch_len < self.page_size {
                break;
            }
            start += self.page_size;
        }

        Ok(all_rows)
    }
}
