//! HTML extraction for product pages
//!
//! Pure functions from raw markup to structured records. No I/O and no
//! shared state beyond the lazily compiled default selectors.

pub mod config;
pub mod document;
pub mod error;
pub mod product_parser;
pub mod sku;

pub use self::config::{ExtractionSelectors, FieldRule};
pub use document::{DocumentQuery, HtmlDocument, NodeQuery, Pattern};
pub use error::{ParsingError, ParsingResult};
pub use product_parser::ProductExtractor;

use once_cell::sync::Lazy;

use crate::domain::{ExtractionResult, VariantResult};

static DEFAULT_EXTRACTOR: Lazy<ProductExtractor> =
    Lazy::new(|| ProductExtractor::new().expect("default selectors are valid"));

/// Shared extractor built from [`ExtractionSelectors::default`]
pub fn default_extractor() -> &'static ProductExtractor {
    &DEFAULT_EXTRACTOR
}

/// Extract price, name, brand and stock status with the default selectors
pub fn extract_product(markup: &str) -> ExtractionResult {
    DEFAULT_EXTRACTOR.extract_product(markup)
}

/// Product display name, or the placeholder when nothing matches
pub fn extract_product_name(markup: &str) -> String {
    DEFAULT_EXTRACTOR.extract_product_name(markup)
}

/// Variants of the product, in document order
pub fn extract_variants(markup: &str, base_url: &str) -> Vec<VariantResult> {
    DEFAULT_EXTRACTOR.extract_variants(markup, base_url)
}
