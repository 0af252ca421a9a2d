//! Domain module - Product records and batch outcomes
//!
//! Plain data types shared by the extractor and the batch coordinator.
//! No I/O lives here.

pub mod batch;
pub mod product;

pub use batch::{BatchId, BatchReport, BatchResultRecord};
pub use product::{DEFAULT_PRODUCT_NAME, ExtractionResult, VariantReport, VariantResult};
