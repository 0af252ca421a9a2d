//! Sephora product scraper
//!
//! Fetches product pages through a JavaScript-rendering proxy and extracts
//! price, name, brand, stock status and color/size variants. Batches run on
//! a bounded worker pool and always come back in input order, one record per
//! URL, with failures isolated per item.

pub mod crawling;
pub mod domain;
pub mod infrastructure;

pub use crawling::{BatchCoordinator, BatchError, FetchError, FnFetcher, PageFetcher, run_batch, scrape_variants};
pub use domain::{BatchReport, BatchResultRecord, ExtractionResult, VariantReport, VariantResult};
pub use infrastructure::{
    AppConfig, ProxyFetcher, extract_product, extract_product_name, extract_variants,
};
