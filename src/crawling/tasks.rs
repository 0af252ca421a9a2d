//! # Batch task definitions

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One URL of a batch, tagged with its position in the caller's list.
///
/// Claimed by exactly one worker; its record is written back at
/// `original_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchTask {
    pub original_index: usize,
    pub url: String,
}

impl FetchTask {
    pub fn new(original_index: usize, url: impl Into<String>) -> Self {
        Self {
            original_index,
            url: url.into(),
        }
    }
}

/// Enumerate `urls` into a queue in input order
pub fn build_queue<S: AsRef<str>>(urls: &[S]) -> VecDeque<FetchTask> {
    urls.iter()
        .enumerate()
        .map(|(index, url)| FetchTask::new(index, url.as_ref()))
        .collect()
}
