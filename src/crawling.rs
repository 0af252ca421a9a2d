//! # Batch crawling
//!
//! - `fetcher`: the page fetching seam (`PageFetcher`) and its error type
//! - `tasks`: queued work items
//! - `coordinator`: the bounded worker pool producing ordered batch reports
//! - `variants`: single-page variant discovery

pub mod coordinator;
pub mod fetcher;
pub mod tasks;
pub mod variants;

pub use coordinator::{
    BatchCoordinator, BatchError, CANCELLED_MESSAGE, TASK_PANICKED_MESSAGE, WORKER_LOST_MESSAGE,
    run_batch,
};
pub use fetcher::{FetchError, FnFetcher, PageFetcher};
pub use tasks::FetchTask;
pub use variants::{scrape_variants, scrape_variants_with};
