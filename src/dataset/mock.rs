//! Mock dataset source for testing.

use async_trait::async_trait;

use crate::error::Result;

use super::{DatasetRow, DatasetSource, ScoreValue};

/// A dataset source that serves a fixed, in-memory snapshot.
#[derive(Debug, Clone, Default)]
pub struct MockDatasetSource {
    rows: Vec<DatasetRow>,
}

impl MockDatasetSource {
    /// Creates a source serving the given rows.
    pub fn new(rows: Vec<DatasetRow>) -> Self {
        Self { rows }
    }

    /// Creates a source with a small fixture: a few regions, one spelled-out
    /// score, one missing score.
    pub fn sample() -> Self {
        Self::new(vec![
            row(1, "Singapore", "Asia", Some(ScoreValue::Number(4.3)), 2023),
            row(2, "Japan", "Asia", Some(ScoreValue::Number(3.9)), 2023),
            row(
                3,
                "Vietnam",
                "Asia",
                Some(ScoreValue::Text("three point five".to_string())),
                2023,
            ),
            row(4, "Mongolia", "Asia", Some(ScoreValue::Number(2.5)), 2023),
            row(5, "Germany", "Europe", Some(ScoreValue::Number(4.1)), 2023),
            row(
                6,
                "Spain",
                "Europe",
                Some(ScoreValue::Text("3.8".to_string())),
                2023,
            ),
            row(7, "Nauru", "Oceania", None, 2023),
            row(8, "Chile", "Americas", Some(ScoreValue::Number(3.2)), 2022),
        ])
    }
}

fn row(id: i64, country: &str, region: &str, lpi_score: Option<ScoreValue>, year: i64) -> DatasetRow {
    DatasetRow {
        id,
        country: country.to_string(),
        region: region.to_string(),
        lpi_score,
        year,
    }
}

#[async_trait]
impl DatasetSource for MockDatasetSource {
    async fn fetch_snapshot(&self) -> Result<Vec<DatasetRow>> {
        Ok(self.rows.clone())
    }
}
