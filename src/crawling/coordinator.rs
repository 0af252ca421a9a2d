//! # Batch fetch coordinator
//!
//! Runs one fetch+extract task per URL on a fixed pool of workers and
//! returns one record per input URL, in input order.
//!
//! Workers claim tasks from a shared queue (`pop_front` under the lock) and
//! send finished records over a channel. Only the coordinator writes the
//! pre-sized slot vector, so completion order never affects output order.
//! A failed fetch becomes a failure record; it never stops the batch.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::fetcher::{FetchError, PageFetcher};
use super::tasks::{FetchTask, build_queue};
use crate::domain::{BatchId, BatchReport, BatchResultRecord};
use crate::infrastructure::config::defaults::MAX_CONCURRENCY;
use crate::infrastructure::parsing::{ProductExtractor, default_extractor};

/// Message recorded for items that were still queued when the batch was cancelled
pub const CANCELLED_MESSAGE: &str = "batch cancelled before fetch";

/// Prefix of the message recorded when fetching or extracting an item panics
pub const TASK_PANICKED_MESSAGE: &str = "fetch task panicked";

/// Message recorded for items lost to a worker that terminated abnormally
pub const WORKER_LOST_MESSAGE: &str = "worker terminated before recording a result";

/// Invalid batch input, reported before any fetch starts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("URL list must not be empty")]
    EmptyUrlList,

    #[error("URL at index {index} is empty")]
    EmptyUrl { index: usize },

    #[error("Concurrency limit must be at least 1 (got {requested})")]
    InvalidConcurrency { requested: usize },
}

type SharedQueue = Arc<Mutex<VecDeque<FetchTask>>>;

/// Validate the input and return the effective concurrency limit
fn validate<S: AsRef<str>>(urls: &[S], concurrency_limit: usize) -> Result<usize, BatchError> {
    if urls.is_empty() {
        return Err(BatchError::EmptyUrlList);
    }
    if let Some(index) = urls.iter().position(|url| url.as_ref().trim().is_empty()) {
        return Err(BatchError::EmptyUrl { index });
    }
    if concurrency_limit < 1 {
        return Err(BatchError::InvalidConcurrency {
            requested: concurrency_limit,
        });
    }
    Ok(concurrency_limit.min(MAX_CONCURRENCY))
}

/// Coordinates bounded-concurrency batch scraping over an injected fetcher
#[derive(Clone)]
pub struct BatchCoordinator {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<ProductExtractor>,
}

impl BatchCoordinator {
    /// Coordinator using the default selectors
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_extractor(fetcher, Arc::new(default_extractor().clone()))
    }

    pub fn with_extractor(fetcher: Arc<dyn PageFetcher>, extractor: Arc<ProductExtractor>) -> Self {
        Self { fetcher, extractor }
    }

    /// Fetch and extract every URL with at most `concurrency_limit` fetches
    /// in flight (capped at [`MAX_CONCURRENCY`]).
    pub async fn run_batch<S: AsRef<str>>(
        &self,
        urls: &[S],
        concurrency_limit: usize,
    ) -> Result<BatchReport, BatchError> {
        self.run_batch_with_cancellation(urls, concurrency_limit, CancellationToken::new())
            .await
    }

    /// Like [`run_batch`](Self::run_batch), but once `cancel` fires no new
    /// fetch is started. Items still queued get a failure record; fetches
    /// already in flight complete normally.
    pub async fn run_batch_with_cancellation<S: AsRef<str>>(
        &self,
        urls: &[S],
        concurrency_limit: usize,
        cancel: CancellationToken,
    ) -> Result<BatchReport, BatchError> {
        let limit = validate(urls, concurrency_limit)?;

        let batch_id = BatchId::new();
        let started_at = Utc::now();
        let timer = Instant::now();
        let total = urls.len();
        let worker_count = limit.min(total);

        info!(
            "Batch {} started: {} URLs, {} workers (requested {})",
            batch_id, total, worker_count, concurrency_limit
        );

        let queue: SharedQueue = Arc::new(Mutex::new(build_queue(urls)));
        let (tx, mut rx) = mpsc::channel::<BatchResultRecord>(total);

        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            workers.spawn(worker_loop(
                worker_id,
                Arc::clone(&queue),
                Arc::clone(&self.fetcher),
                Arc::clone(&self.extractor),
                tx.clone(),
                cancel.clone(),
            ));
        }
        // Channel closes once every worker has exited
        drop(tx);

        let mut slots: Vec<Option<BatchResultRecord>> = (0..total).map(|_| None).collect();
        while let Some(record) = rx.recv().await {
            if let Some(slot) = slots.get_mut(record.original_index) {
                *slot = Some(record);
            }
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!("Batch {} worker terminated abnormally: {}", batch_id, e);
            }
        }

        let results: Vec<BatchResultRecord> = slots
            .into_iter()
            .zip(urls)
            .enumerate()
            .map(|(index, (slot, url))| {
                slot.unwrap_or_else(|| {
                    warn!("No result recorded for {} (index {})", url.as_ref(), index);
                    BatchResultRecord::failed(index, url.as_ref(), WORKER_LOST_MESSAGE)
                })
            })
            .collect();

        let elapsed_ms = u64::try_from(timer.elapsed().as_millis()).unwrap_or(u64::MAX);
        let report = BatchReport::from_records(batch_id, results, started_at, elapsed_ms);

        info!(
            "Batch {} finished in {}ms: {} successful, {} failed",
            batch_id, report.elapsed_ms, report.successful, report.failed
        );
        Ok(report)
    }

    /// Single-URL path: a batch of one with concurrency 1
    pub async fn scrape_one(&self, url: &str) -> Result<BatchResultRecord, BatchError> {
        let report = self.run_batch(&[url], 1).await?;
        report.results.into_iter().next().ok_or(BatchError::EmptyUrlList)
    }
}

/// Run a batch with the default extractor
pub async fn run_batch<S: AsRef<str>>(
    urls: &[S],
    concurrency_limit: usize,
    fetcher: Arc<dyn PageFetcher>,
) -> Result<BatchReport, BatchError> {
    BatchCoordinator::new(fetcher).run_batch(urls, concurrency_limit).await
}

async fn worker_loop(
    worker_id: usize,
    queue: SharedQueue,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<ProductExtractor>,
    tx: mpsc::Sender<BatchResultRecord>,
    cancel: CancellationToken,
) {
    let mut processed = 0usize;

    loop {
        let next = queue.lock().await.pop_front();
        let Some(task) = next else {
            break;
        };

        let record = if cancel.is_cancelled() {
            BatchResultRecord::failed(task.original_index, task.url, FetchError::Cancelled.to_string())
        } else {
            let (index, url) = (task.original_index, task.url.clone());
            // A panic costs only this item; the worker keeps draining the queue
            match AssertUnwindSafe(process_task(fetcher.as_ref(), &extractor, task))
                .catch_unwind()
                .await
            {
                Ok(record) => record,
                Err(payload) => {
                    let reason = panic_reason(payload.as_ref());
                    warn!("Worker {} panicked on {} (index {}): {}", worker_id, url, index, reason);
                    BatchResultRecord::failed(index, url, format!("{TASK_PANICKED_MESSAGE}: {reason}"))
                }
            }
        };

        processed += 1;
        if tx.send(record).await.is_err() {
            break;
        }
    }

    debug!("Worker {} done after {} tasks", worker_id, processed);
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

async fn process_task(
    fetcher: &dyn PageFetcher,
    extractor: &ProductExtractor,
    task: FetchTask,
) -> BatchResultRecord {
    match fetcher.fetch(&task.url).await {
        Ok(markup) => {
            let extraction = extractor.extract_product(&markup).with_url(task.url.as_str());
            debug!("Extracted {} (index {})", task.url, task.original_index);
            BatchResultRecord::succeeded(task.original_index, task.url, extraction)
        }
        Err(e) => {
            info!("Fetch failed for {} (index {}): {}", task.url, task.original_index, e);
            BatchResultRecord::failed(task.original_index, task.url, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawling::fetcher::FnFetcher;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn page(name: &str) -> String {
        format!(r#"<html><body><span data-at="product_name">{name}</span></body></html>"#)
    }

    fn echo_fetcher() -> Arc<dyn PageFetcher> {
        Arc::new(FnFetcher::new(|url: String| async move { Ok(page(&url)) }))
    }

    #[test]
    fn validation_rules() {
        assert_eq!(validate::<&str>(&[], 3), Err(BatchError::EmptyUrlList));
        assert_eq!(validate(&["https://a", "  "], 3), Err(BatchError::EmptyUrl { index: 1 }));
        assert_eq!(
            validate(&["https://a"], 0),
            Err(BatchError::InvalidConcurrency { requested: 0 })
        );
        assert_eq!(validate(&["https://a"], 50), Ok(MAX_CONCURRENCY));
        assert_eq!(validate(&["https://a"], 4), Ok(4));
    }

    #[tokio::test]
    async fn records_are_in_input_order() {
        let coordinator = BatchCoordinator::new(echo_fetcher());
        let urls = ["https://x/1", "https://x/2", "https://x/3", "https://x/4"];

        let report = coordinator.run_batch(&urls, 3).await.unwrap();

        assert_eq!(report.total, 4);
        for (i, record) in report.results.iter().enumerate() {
            assert_eq!(record.original_index, i);
            assert_eq!(record.url, urls[i]);
            let extraction = record.extraction.as_ref().unwrap();
            assert_eq!(extraction.url, urls[i]);
            assert_eq!(extraction.name.as_deref(), Some(urls[i]));
        }
    }

    #[tokio::test]
    async fn failure_is_isolated() {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(FnFetcher::new(|url: String| async move {
            if url.ends_with("/bad") {
                Err(FetchError::Network("connection reset".to_string()))
            } else {
                Ok(page("ok"))
            }
        }));

        let report = run_batch(&["https://x/good", "https://x/bad"], 2, fetcher)
            .await
            .unwrap();

        assert_eq!((report.successful, report.failed), (1, 1));
        assert!(report.results[1].extraction.is_none());
        assert!(
            report.results[1]
                .error_message
                .as_deref()
                .unwrap()
                .contains("connection reset")
        );
    }

    #[tokio::test]
    async fn cancelled_batch_fetches_nothing() {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(FnFetcher::new(|_url: String| async move {
            Err::<String, _>(FetchError::Network("should not be called".to_string()))
        }));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = BatchCoordinator::new(fetcher)
            .run_batch_with_cancellation(&["https://a", "https://b"], 2, cancel)
            .await
            .unwrap();

        assert_eq!(report.failed, 2);
        assert!(
            report
                .results
                .iter()
                .all(|r| r.error_message.as_deref() == Some(CANCELLED_MESSAGE))
        );
    }

    #[tokio::test]
    async fn panic_costs_only_its_own_item() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher: Arc<dyn PageFetcher> = {
            let calls = Arc::clone(&calls);
            Arc::new(FnFetcher::new(move |url: String| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    assert!(!url.ends_with("/boom"), "fetcher crashed");
                    Ok(page("fine"))
                }
            }))
        };

        // one worker: the panicking first item must not strand the rest
        let report = BatchCoordinator::new(fetcher)
            .run_batch(&["https://x/boom", "https://x/2", "https://x/3"], 1)
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!((report.successful, report.failed), (2, 1));
        let message = report.results[0].error_message.as_deref().unwrap();
        assert!(message.starts_with(TASK_PANICKED_MESSAGE));
        assert!(message.contains("fetcher crashed"));
        assert!(report.results[1].success);
        assert!(report.results[2].success);
    }

    #[test]
    fn panic_reason_reads_str_and_string_payloads() {
        assert_eq!(panic_reason(&"static text"), "static text");
        assert_eq!(panic_reason(&String::from("owned text")), "owned text");
        assert_eq!(panic_reason(&42_u32), "unknown panic");
    }

    #[test]
    fn cancelled_records_use_the_fetch_error_text() {
        assert_eq!(FetchError::Cancelled.to_string(), CANCELLED_MESSAGE);
    }

    #[tokio::test]
    async fn scrape_one_returns_the_single_record() {
        let record = BatchCoordinator::new(echo_fetcher())
            .scrape_one("https://x/only")
            .await
            .unwrap();

        assert!(record.success);
        assert_eq!(record.original_index, 0);
    }
}
