//! # Page fetching seam
//!
//! The coordinator only knows how to ask for a page's markup. How the
//! request reaches the rendering proxy (API key, geo parameter, timeout) is
//! the fetcher's business.

use async_trait::async_trait;
use std::future::Future;
use thiserror::Error;

/// Why a page could not be fetched. The display text becomes the record's
/// `error_message`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timeout after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("HTTP error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The batch was cancelled before this item's fetch started
    #[error("batch cancelled before fetch")]
    Cancelled,
}

impl FetchError {
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// HTTP status code for non-success responses
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Fetches raw document markup for a target URL
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`, enforcing the fetcher's own timeout
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Adapter turning an async closure into a [`PageFetcher`]
pub struct FnFetcher<F> {
    fetch_fn: F,
}

impl<F, Fut> FnFetcher<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, FetchError>> + Send,
{
    pub const fn new(fetch_fn: F) -> Self {
        Self { fetch_fn }
    }
}

#[async_trait]
impl<F, Fut> PageFetcher for FnFetcher<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, FetchError>> + Send,
{
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        (self.fetch_fn)(url.to_string()).await
    }
}
