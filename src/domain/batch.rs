use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::product::ExtractionResult;

/// Unique identifier for one batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(Uuid);

impl BatchId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-URL outcome of a batch run.
///
/// Exactly one record exists per input URL, stored at `original_index`.
/// A failed fetch is a record with `success == false`, never a call-level error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResultRecord {
    pub original_index: usize,
    pub url: String,
    pub success: bool,
    pub extraction: Option<ExtractionResult>,
    pub error_message: Option<String>,
}

impl BatchResultRecord {
    pub fn succeeded(original_index: usize, url: impl Into<String>, extraction: ExtractionResult) -> Self {
        Self {
            original_index,
            url: url.into(),
            success: true,
            extraction: Some(extraction),
            error_message: None,
        }
    }

    pub fn failed(original_index: usize, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            original_index,
            url: url.into(),
            success: false,
            extraction: None,
            error_message: Some(message.into()),
        }
    }
}

/// Full result of a batch run, ordered by input position
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub batch_id: BatchId,
    pub results: Vec<BatchResultRecord>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl BatchReport {
    /// Build a report; counts are derived from `results`.
    pub fn from_records(
        batch_id: BatchId,
        results: Vec<BatchResultRecord>,
        started_at: DateTime<Utc>,
        elapsed_ms: u64,
    ) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        Self {
            batch_id,
            total: results.len(),
            successful,
            failed: results.len() - successful,
            results,
            started_at,
            elapsed_ms,
        }
    }

    /// URLs whose fetch failed, in input order. Useful for resubmitting.
    pub fn failed_urls(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.url.as_str())
            .collect()
    }
}
